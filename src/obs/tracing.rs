// self
use crate::{_prelude::*, rate_limit::RateLimitInfo};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used around each backend request.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the method + endpoint.
	pub fn new(method: &http::Method, endpoint: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("grc_api_client.request", method = method.as_str(), endpoint);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, endpoint);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the completion event for a response with `status`.
pub fn log_response(status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(status, "Backend responded.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

/// Emits a warning for a 429 rejection.
pub fn log_rate_limited(info: &RateLimitInfo, listeners: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			limit = info.limit,
			reset_at = info.reset_at,
			retry_after = info.retry_after,
			listeners,
			"Backend rate limit exceeded."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (info, listeners);
	}
}

/// Emits an event for a request that failed before or after reaching the backend.
pub fn log_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(error = %error, status = error.status(), "Backend request failed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
