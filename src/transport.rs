//! Transport primitives for backend calls.
//!
//! [`ApiClient`](crate::client::ApiClient) depends on an HTTP stack only through
//! [`ApiTransport`]: it hands over a fully built [`HttpRequest`] and expects the complete
//! [`HttpResponse`] back, body included. Status interpretation, rate-limit parsing, and error
//! mapping stay in the client so every transport behaves identically. The default
//! [`ReqwestTransport`] is available behind the `reqwest` feature; tests and embedders can supply
//! their own implementation.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::ConfigError};

/// Request handed to an [`ApiTransport`].
pub type HttpRequest = http::Request<Vec<u8>>;
/// Response returned by an [`ApiTransport`], body fully read.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing backend requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// clones of the client across tasks, and the returned future must be `Send`. Any HTTP status,
/// including 4xx and 5xx, is a successful exchange from the transport's point of view; only
/// failures to obtain a response belong in [`ApiTransport::Error`].
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type Error: 'static + Send + Sync + StdError;

	/// Sends `request` and reads the full response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client carrying the configured user agent.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().user_agent(config.user_agent.as_str()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	type Error = ReqwestError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
