//! The request façade every backend call goes through.
//!
//! [`ApiClient::request`] builds an authenticated JSON request, sends it through the configured
//! [`ApiTransport`], and normalizes the outcome:
//!
//! - HTTP 429 becomes [`RateLimitError`] after the parsed [`RateLimitInfo`] has been broadcast to
//!   the client's [`RateLimitEvents`].
//! - Any other non-2xx status becomes [`ApiError`] carrying the status and the body's `detail`.
//! - HTTP 204 resolves to the value deserialized from an empty JSON object; the body is ignored.
//! - Anything else is deserialized into the caller's type.
//!
//! Nothing is retried. Callers own backoff decisions and can read `retry_after`/`reset_at` from
//! the error or from [`ApiClient::last_rate_limit`].

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::BearerToken,
	config::ClientConfig,
	error::{ApiError, ConfigError, RateLimitError, TransportError},
	events::RateLimitEvents,
	obs::{self, RequestOutcome, RequestSpan},
	rate_limit::{ErrorBody, RateLimitInfo},
	request::{CancelToken, RequestOptions},
	transport::{ApiTransport, HttpRequest, HttpResponse},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

/// Decoded response together with the metadata the backend attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse<T> {
	/// HTTP status code.
	pub status: u16,
	/// Rate-limit snapshot advertised by the response headers, if any.
	pub rate_limit: Option<RateLimitInfo>,
	/// Decoded body.
	pub body: T,
}

/// Placeholder body for endpoints that answer with no content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// JSON HTTP client bound to one backend.
///
/// Cloning is cheap: clones share the transport, the rate-limit event registry, and the
/// last-seen rate-limit snapshot.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	config: ClientConfig,
	transport: Arc<T>,
	events: RateLimitEvents,
	last_rate_limit: Arc<RwLock<Option<RateLimitInfo>>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that sends requests through `transport`.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Self {
		Self {
			config,
			transport: transport.into(),
			events: RateLimitEvents::default(),
			last_rate_limit: Default::default(),
		}
	}

	/// Replaces the event registry, typically with one shared across clients or UI components.
	pub fn with_events(mut self, events: RateLimitEvents) -> Self {
		self.events = events;

		self
	}

	/// Configuration in use.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Registry notified on every 429.
	pub fn events(&self) -> &RateLimitEvents {
		&self.events
	}

	/// Most recent rate-limit snapshot observed on any response.
	pub fn last_rate_limit(&self) -> Option<RateLimitInfo> {
		self.last_rate_limit.read().clone()
	}

	/// Performs the request and decodes the body into `R`.
	pub async fn request<R>(&self, endpoint: &str, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request_with_metadata(endpoint, options).await.map(|response| response.body)
	}

	/// Performs the request and returns the decoded body with its status and rate-limit headers.
	pub async fn request_with_metadata<R>(
		&self,
		endpoint: &str,
		options: RequestOptions,
	) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		let method = options.method.clone();
		let span = RequestSpan::new(&method, endpoint);

		obs::record_request_outcome(&method, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let timeout = options.timeout.or(self.config.timeout);
				let cancel = options.cancel.clone();
				let request = self.build_request(endpoint, options)?;
				let response = self.dispatch(request, timeout, cancel.as_ref()).await?;

				self.interpret(response)
			})
			.await;

		if let Err(e) = &result {
			obs::log_failure(e);
		}

		obs::record_request_outcome(&method, RequestOutcome::of(&result));

		result
	}

	/// `GET endpoint`.
	pub async fn get<R>(&self, endpoint: &str, token: Option<&BearerToken>) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request(endpoint, RequestOptions::new(Method::GET).maybe_token(token)).await
	}

	/// `POST endpoint` with a JSON body.
	pub async fn post<B, R>(
		&self,
		endpoint: &str,
		token: Option<&BearerToken>,
		body: &B,
	) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(Method::POST, endpoint, token, body).await
	}

	/// `PUT endpoint` with a JSON body.
	pub async fn put<B, R>(
		&self,
		endpoint: &str,
		token: Option<&BearerToken>,
		body: &B,
	) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(Method::PUT, endpoint, token, body).await
	}

	/// `PATCH endpoint` with a JSON body.
	pub async fn patch<B, R>(
		&self,
		endpoint: &str,
		token: Option<&BearerToken>,
		body: &B,
	) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(Method::PATCH, endpoint, token, body).await
	}

	/// `DELETE endpoint`.
	///
	/// No-content answers decode into `()`, [`Empty`], or [`serde_json::Value`].
	pub async fn delete<R>(&self, endpoint: &str, token: Option<&BearerToken>) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request(endpoint, RequestOptions::new(Method::DELETE).maybe_token(token)).await
	}

	async fn send_json<B, R>(
		&self,
		method: Method,
		endpoint: &str,
		token: Option<&BearerToken>,
		body: &B,
	) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let options = RequestOptions::new(method).maybe_token(token).json(body)?;

		self.request(endpoint, options).await
	}

	fn build_request(&self, endpoint: &str, options: RequestOptions) -> Result<HttpRequest> {
		let url = self.config.resolve(endpoint)?;
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		if let Some(token) = &options.token {
			let value = HeaderValue::try_from(token.authorization_value())
				.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.to_string() })?;

			headers.insert(AUTHORIZATION, value);
		}
		for (name, value) in &options.headers {
			let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
			let header_name = HeaderName::try_from(name.as_str()).map_err(|_| invalid())?;
			let header_value = HeaderValue::try_from(value.as_str()).map_err(|_| invalid())?;

			headers.insert(header_name, header_value);
		}

		let mut request = http::Request::builder()
			.method(options.method)
			.uri(url.as_str())
			.body(options.body.unwrap_or_default())
			.map_err(ConfigError::from)?;

		*request.headers_mut() = headers;

		Ok(request)
	}

	async fn dispatch(
		&self,
		request: HttpRequest,
		timeout: Option<StdDuration>,
		cancel: Option<&CancelToken>,
	) -> Result<HttpResponse> {
		let exchange = async {
			let pending = self.transport.execute(request);

			match timeout {
				Some(after) => match tokio::time::timeout(after, pending).await {
					Ok(response) => response.map_err(TransportError::network),
					Err(_) => Err(TransportError::TimedOut { after }),
				},
				None => pending.await.map_err(TransportError::network),
			}
		};
		let response = match cancel {
			Some(token) if token.is_cancelled() => Err(TransportError::Cancelled),
			Some(token) => tokio::select! {
				biased;
				_ = token.cancelled() => Err(TransportError::Cancelled),
				response = exchange => response,
			},
			None => exchange.await,
		};

		response.map_err(Error::from)
	}

	fn interpret<R>(&self, response: HttpResponse) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		let status = response.status();
		let (parts, body) = response.into_parts();

		obs::log_response(status.as_u16());

		if status == StatusCode::TOO_MANY_REQUESTS {
			let (info, message) = RateLimitInfo::from_rejection(&body, &parts.headers);

			*self.last_rate_limit.write() = Some(info.clone());

			let listeners = self.events.emit(&info);

			obs::log_rate_limited(&info, listeners);

			return Err(RateLimitError::new(
				message.unwrap_or_else(|| RateLimitError::FALLBACK_MESSAGE.into()),
				info,
			)
			.into());
		}

		let rate_limit = RateLimitInfo::from_headers(&parts.headers);

		if let Some(info) = &rate_limit {
			*self.last_rate_limit.write() = Some(info.clone());
		}
		if !status.is_success() {
			let message = ErrorBody::parse_lenient(&body)
				.detail_message()
				.unwrap_or_else(|| ApiError::FALLBACK_MESSAGE.into());

			return Err(ApiError::new(status.as_u16(), message).into());
		}

		let decoded =
			if status == StatusCode::NO_CONTENT { decode_no_content() } else { decode_json(&body) };
		let body =
			decoded.map_err(|source| Error::Decode { source, status: status.as_u16() })?;

		Ok(ApiResponse { status: status.as_u16(), rate_limit, body })
	}
}

type DecodeResult<R> = Result<R, serde_path_to_error::Error<serde_json::Error>>;

// An empty object stands in for the missing body; types that reject it, like `()`, get `null`.
fn decode_no_content<R>() -> DecodeResult<R>
where
	R: DeserializeOwned,
{
	serde_path_to_error::deserialize(serde_json::Value::Object(Default::default())).or_else(
		|empty_object| {
			serde_path_to_error::deserialize(serde_json::Value::Null).map_err(|_| empty_object)
		},
	)
}

fn decode_json<R>(body: &[u8]) -> DecodeResult<R>
where
	R: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de)?;

	de.end()
		.map_err(|e| serde_path_to_error::Error::new(serde_path_to_error::Track::new().path(), e))?;

	Ok(value)
}

#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by its own reqwest transport.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport))
	}

	/// Creates a client configured from [`NEXT_PUBLIC_API_URL`](crate::config::API_URL_ENV).
	pub fn from_env() -> Result<Self> {
		Self::new(ClientConfig::from_env()?)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: Arc::clone(&self.transport),
			events: self.events.clone(),
			last_rate_limit: Arc::clone(&self.last_rate_limit),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("events", &self.events)
			.field("last_rate_limit", &self.last_rate_limit())
			.finish()
	}
}
