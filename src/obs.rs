//! Optional observability helpers for backend requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to wrap every request in a span named
//!   `grc_api_client.request` with `method` and `endpoint` fields, and to emit events for
//!   completed, failed, and rate-limited requests.
//! - Enable `metrics` to increment the `grc_api_client_request_total` counter for every
//!   attempt/success/failure/rate_limited outcome, labeled by `method` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Request handed to the transport.
	Attempt,
	/// 2xx response decoded successfully.
	Success,
	/// Any failure other than a rate-limit rejection.
	Failure,
	/// Backend answered with HTTP 429.
	RateLimited,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
			RequestOutcome::RateLimited => "rate_limited",
		}
	}

	/// Classifies a finished request.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => RequestOutcome::Success,
			Err(Error::RateLimited(_)) => RequestOutcome::RateLimited,
			Err(_) => RequestOutcome::Failure,
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
