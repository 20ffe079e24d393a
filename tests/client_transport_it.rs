mod common;

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use common::*;
use grc_api_client::{
	auth::BearerToken,
	client::{ApiClient, Empty},
	error::{ApiError, ConfigError, Error, TransportError},
	events::RateLimitEvents,
	http::{HeaderMap, Method, StatusCode},
	rate_limit::RateLimitInfo,
	request::{CancelToken, RequestOptions},
	transport::{ApiTransport, HttpRequest, HttpResponse, TransportFuture},
};

#[derive(Debug)]
enum FakeTransportError {
	ConnectionReset,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::ConnectionReset => write!(f, "Connection reset by peer."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Debug)]
struct RecordedRequest {
	method: Method,
	uri: String,
	headers: HeaderMap,
	body: Vec<u8>,
}

/// Transport that answers every request with the same scripted response.
#[derive(Clone)]
struct ScriptedTransport {
	status: StatusCode,
	headers: Vec<(&'static str, &'static str)>,
	body: Vec<u8>,
	delay: Option<StdDuration>,
	fail: bool,
	calls: Arc<AtomicUsize>,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}
impl ScriptedTransport {
	fn respond(status: u16, body: &str) -> Self {
		Self {
			status: StatusCode::from_u16(status).expect("Scripted status should be valid."),
			headers: Vec::new(),
			body: body.as_bytes().to_vec(),
			delay: None,
			fail: false,
			calls: Default::default(),
			requests: Default::default(),
		}
	}

	fn failing() -> Self {
		Self { fail: true, ..Self::respond(200, "") }
	}

	fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
		self.headers.push((name, value));

		self
	}

	fn delayed(mut self, delay: StdDuration) -> Self {
		self.delay = Some(delay);

		self
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn last_request(&self) -> RecordedRequest {
		self.requests.lock().last().cloned().expect("At least one request should be recorded.")
	}
}
impl ApiTransport for ScriptedTransport {
	type Error = FakeTransportError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error> {
		let script = self.clone();

		Box::pin(async move {
			script.calls.fetch_add(1, Ordering::SeqCst);
			script.requests.lock().push(RecordedRequest {
				method: request.method().clone(),
				uri: request.uri().to_string(),
				headers: request.headers().clone(),
				body: request.body().clone(),
			});

			if let Some(delay) = script.delay {
				tokio::time::sleep(delay).await;
			}
			if script.fail {
				return Err(FakeTransportError::ConnectionReset);
			}

			let mut response = HttpResponse::new(script.body.clone());

			*response.status_mut() = script.status;

			for (name, value) in &script.headers {
				response.headers_mut().insert(
					*name,
					value.parse().expect("Scripted header value should be valid."),
				);
			}

			Ok(response)
		})
	}
}

fn client(transport: &ScriptedTransport) -> ApiClient<ScriptedTransport> {
	ApiClient::with_transport(offline_config(), transport.clone())
}

#[tokio::test]
async fn request_carries_json_and_bearer_headers() {
	let transport = ScriptedTransport::respond(200, "{\"ok\":true}");
	let client = client(&transport);
	let options = RequestOptions::new(Method::PUT)
		.token(BearerToken::new("session-42"))
		.json(&json!({ "status": "mitigated" }))
		.expect("JSON body should serialize.")
		.header("X-Tenant", "acme");
	let body: Value = client
		.request("/incidents/3", options)
		.await
		.expect("Scripted response should decode.");
	let seen = transport.last_request();

	assert_eq!(body, json!({ "ok": true }));
	assert_eq!(seen.method, Method::PUT);
	assert_eq!(seen.uri, "https://grc.example.com/api/incidents/3");
	assert_eq!(seen.headers["content-type"], "application/json");
	assert_eq!(seen.headers["authorization"], "Bearer session-42");
	assert_eq!(seen.headers["x-tenant"], "acme");
	assert_eq!(seen.body, br#"{"status":"mitigated"}"#.to_vec());
}

#[tokio::test]
async fn caller_headers_override_defaults() {
	let transport = ScriptedTransport::respond(200, "{}");
	let client = client(&transport);
	let options = RequestOptions::default().header("Content-Type", "application/merge-patch+json");
	let _: Empty = client.request("/settings", options).await.expect("Request should succeed.");

	assert_eq!(transport.last_request().headers["content-type"], "application/merge-patch+json");
	assert!(transport.last_request().headers.get("authorization").is_none());
}

#[tokio::test]
async fn invalid_header_is_rejected_before_dispatch() {
	let transport = ScriptedTransport::respond(200, "{}");
	let client = client(&transport);
	let err = client
		.request::<Value>("/settings", RequestOptions::default().header("bad header", "x"))
		.await
		.expect_err("Header names with spaces must be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidHeader { .. })));
	assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn no_content_ignores_body_bytes() {
	let transport = ScriptedTransport::respond(204, "definitely not json");
	let client = client(&transport);
	let value: Value = client
		.delete("/integrations/slack", None)
		.await
		.expect("204 responses must not parse the body.");

	assert_eq!(value, json!({}));
}

#[tokio::test]
async fn timeout_aborts_slow_requests() {
	let transport =
		ScriptedTransport::respond(200, "{}").delayed(StdDuration::from_millis(500));
	let client = client(&transport);
	let err = client
		.request::<Value>(
			"/reports",
			RequestOptions::default().timeout(StdDuration::from_millis(20)),
		)
		.await
		.expect_err("Slow requests should time out.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::TimedOut { after }) if after == StdDuration::from_millis(20)
	));
}

#[tokio::test]
async fn config_timeout_applies_when_request_sets_none() {
	let transport =
		ScriptedTransport::respond(200, "{}").delayed(StdDuration::from_millis(500));
	let client: ApiClient<ScriptedTransport> = ApiClient::with_transport(
		offline_config().with_timeout(StdDuration::from_millis(10)),
		transport.clone(),
	);
	let err = client.get::<Value>("/reports", None).await.expect_err("Default deadline applies.");

	assert!(matches!(err, Error::Transport(TransportError::TimedOut { .. })));
}

#[tokio::test]
async fn cancel_token_aborts_in_flight_request() {
	let transport =
		ScriptedTransport::respond(200, "{}").delayed(StdDuration::from_secs(5));
	let client = client(&transport);
	let token = CancelToken::new();
	let canceller = {
		let token = token.clone();

		tokio::spawn(async move {
			tokio::time::sleep(StdDuration::from_millis(20)).await;
			token.cancel();
		})
	};
	let err = client
		.request::<Value>("/simulations/run", RequestOptions::default().cancel_with(&token))
		.await
		.expect_err("Cancelled requests should fail.");

	canceller.await.expect("Canceller task should finish.");

	assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
	assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn cancelled_token_prevents_dispatch() {
	let transport = ScriptedTransport::respond(200, "{}");
	let client = client(&transport);
	let token = CancelToken::new();

	token.cancel();

	let err = client
		.request::<Value>("/risks", RequestOptions::default().cancel_with(&token))
		.await
		.expect_err("Pre-cancelled requests should fail.");

	assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
	assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn network_failure_is_wrapped() {
	let transport = ScriptedTransport::failing();
	let client = client(&transport);
	let err = client.get::<Value>("/risks", None).await.expect_err("Transport errors surface.");

	match &err {
		Error::Transport(TransportError::Network { source }) =>
			assert_eq!(source.to_string(), "Connection reset by peer."),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(err.status(), None);
}

#[tokio::test]
async fn shared_events_reach_every_client() {
	let events = RateLimitEvents::default();
	let seen = record_rate_limits(&events);
	let limited = ScriptedTransport::respond(429, "{\"error\":{\"limit\":5,\"reset_at\":1700000300}}")
		.with_header("retry-after", "12");
	let first = client(&limited).with_events(events.clone());
	let second = client(&limited).with_events(events.clone());

	let _ = first.get::<Value>("/vendors", None).await.expect_err("First client is limited.");
	let _ = second.get::<Value>("/vendors", None).await.expect_err("Second client is limited.");

	let seen = seen.lock();

	assert_eq!(seen.len(), 2);
	assert!(seen.iter().all(|info| info.limit == 5 && info.retry_after == Some(12)));
	assert!(seen.iter().all(|info| info.remaining == 0 && info.reset_at == 1_700_000_300));
	assert_eq!(first.last_rate_limit().map(|info| info.limit), Some(5));
}

#[tokio::test]
async fn string_error_field_keeps_detail_message() {
	let transport =
		ScriptedTransport::respond(404, "{\"detail\":\"Not found\",\"error\":\"not_found\"}");
	let err = client(&transport)
		.get::<Value>("/controls/42", None)
		.await
		.expect_err("404 responses should surface as errors.");

	assert_eq!(err.status(), Some(404));
	assert_eq!(err.to_string(), "Not found");
}

#[tokio::test]
async fn blank_detail_falls_back_to_generic_message() {
	let transport = ScriptedTransport::respond(400, "{\"detail\":\"\"}");
	let err = client(&transport)
		.get::<Value>("/controls", None)
		.await
		.expect_err("400 responses should surface as errors.");

	assert_eq!(err.status(), Some(400));
	assert_eq!(err.to_string(), ApiError::FALLBACK_MESSAGE);
}

#[tokio::test]
async fn fractional_reset_keeps_rejection_details() {
	let events = RateLimitEvents::default();
	let seen = record_rate_limits(&events);
	let transport = ScriptedTransport::respond(
		429,
		"{\"error\":{\"message\":\"Slow down\",\"limit\":100,\"retry_after\":30,\"reset_at\":1700000000.5}}",
	);
	let err = client(&transport)
		.with_events(events)
		.get::<Value>("/audits", None)
		.await
		.expect_err("429 responses should surface as errors.");
	let expected = RateLimitInfo::exhausted(100, 1_700_000_000, Some(30));

	assert_eq!(err.to_string(), "Slow down");
	assert_eq!(err.rate_limit_info(), Some(&expected));
	assert_eq!(*seen.lock(), vec![expected]);
}

#[tokio::test]
async fn no_content_decodes_into_unit() {
	let transport = ScriptedTransport::respond(204, "");
	let client = client(&transport);

	client.delete::<()>("/vendors/3", None).await.expect("204 responses should decode into ().");

	let empty: Empty =
		client.delete("/vendors/3", None).await.expect("204 responses should decode into Empty.");

	assert_eq!(empty, Empty {});
}

#[tokio::test]
async fn trailing_bytes_after_json_are_rejected() {
	let transport = ScriptedTransport::respond(200, "{\"ok\":true} trailing");
	let err = client(&transport)
		.get::<Value>("/reports", None)
		.await
		.expect_err("Trailing bytes should fail to decode.");

	assert!(matches!(err, Error::Decode { status: 200, .. }));
}
