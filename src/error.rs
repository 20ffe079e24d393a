//! Client-level error types shared by the façade, transports, and configuration.

// self
use crate::{_prelude::*, rate_limit::RateLimitInfo};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Backend answered with a non-2xx status other than 429.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Backend rejected the request because the rate-limit window is exhausted.
	#[error(transparent)]
	RateLimited(#[from] RateLimitError),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout, cancellation).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Successful response body did not match the expected shape.
	#[error("Response body with status {status} could not be decoded.")]
	Decode {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status carried by backend errors.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			Self::RateLimited(_) => Some(RateLimitError::STATUS),
			Self::Decode { status, .. } => Some(*status),
			Self::Config(_) | Self::Transport(_) => None,
		}
	}

	/// Returns the parsed rate-limit state when the backend answered with 429.
	pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
		match self {
			Self::RateLimited(e) => Some(&e.info),
			_ => None,
		}
	}

	/// Whether the error is a 429 rejection.
	pub fn is_rate_limited(&self) -> bool {
		matches!(self, Self::RateLimited(_))
	}
}

/// Generic non-2xx response from the backend.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Backend-supplied `detail`, or a generic fallback.
	pub message: String,
}
impl ApiError {
	/// Message used when the error body carries no `detail`.
	pub const FALLBACK_MESSAGE: &'static str = "Request failed";

	/// Creates a new API error.
	pub fn new(status: u16, message: impl Into<String>) -> Self {
		Self { status, message: message.into() }
	}
}

/// HTTP 429 rejection carrying the parsed rate-limit state.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct RateLimitError {
	/// Backend-supplied message, or a generic fallback.
	pub message: String,
	/// Rate-limit state parsed from the response.
	pub info: RateLimitInfo,
}
impl RateLimitError {
	/// Message used when the error body carries none.
	pub const FALLBACK_MESSAGE: &'static str = "Rate limit exceeded";
	/// Fixed HTTP status of rate-limit rejections.
	pub const STATUS: u16 = 429;

	/// Creates a new rate-limit error.
	pub fn new(message: impl Into<String>, info: RateLimitInfo) -> Self {
		Self { message: message.into(), info }
	}

	/// Always `429`.
	pub const fn status(&self) -> u16 {
		Self::STATUS
	}
}
impl From<RateLimitError> for ApiError {
	fn from(e: RateLimitError) -> Self {
		Self { status: RateLimitError::STATUS, message: e.message }
	}
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Rejected value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint does not form a valid URL when joined with the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Rejected endpoint.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Caller-supplied header name or value is malformed.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	InvalidBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before its deadline.
	#[error("Request timed out after {after:?}.")]
	TimedOut {
		/// Deadline that elapsed.
		after: StdDuration,
	},
	/// Request was cancelled through its [`CancelToken`](crate::request::CancelToken).
	#[error("Request was cancelled.")]
	Cancelled,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
