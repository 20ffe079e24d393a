//! Per-request options and cooperative cancellation.

// crates.io
use http::Method;
use tokio::sync::watch;
// self
use crate::{_prelude::*, auth::BearerToken, error::ConfigError};

/// Options accepted by [`ApiClient::request`](crate::client::ApiClient::request).
///
/// Mirrors the fetch-style options used by the dashboard: method, JSON body, extra headers, and an
/// optional bearer token, plus a deadline and a [`CancelToken`].
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// HTTP method; `GET` when unset.
	pub method: Method,
	/// Bearer token for the `Authorization` header.
	pub token: Option<BearerToken>,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	/// Extra headers applied after the defaults.
	pub headers: Vec<(String, String)>,
	/// Deadline for the whole exchange; overrides the client default.
	pub timeout: Option<StdDuration>,
	/// Token that aborts the request when cancelled.
	pub cancel: Option<CancelToken>,
}
impl RequestOptions {
	/// Creates options for `method`.
	pub fn new(method: Method) -> Self {
		Self { method, ..Default::default() }
	}

	/// Sets the HTTP method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Attaches a bearer token.
	pub fn token(mut self, token: impl Into<BearerToken>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Attaches an optional bearer token.
	pub fn maybe_token(mut self, token: Option<&BearerToken>) -> Self {
		self.token = token.cloned();

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::InvalidBody)?);

		Ok(self)
	}

	/// Uses an already serialized JSON payload.
	pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Adds a header; later values for the same name replace earlier ones.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the deadline for this request.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Binds the request to `token`.
	pub fn cancel_with(mut self, token: &CancelToken) -> Self {
		self.cancel = Some(token.clone());

		self
	}
}

/// Cloneable cancellation flag shared between a caller and its in-flight requests.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<watch::Sender<bool>>);
impl CancelToken {
	/// Creates a token that is not cancelled.
	pub fn new() -> Self {
		Self(Arc::new(watch::Sender::new(false)))
	}

	/// Cancels every request bound to this token, now and in the future.
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}

	/// Whether [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once the token is cancelled.
	pub async fn cancelled(&self) {
		let mut rx = self.0.subscribe();

		// The sender lives in `self`, so the channel cannot close while waiting.
		let _ = rx.wait_for(|cancelled| *cancelled).await;
	}
}
impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}
