//! Rate-limit state parsed from backend responses.
//!
//! The backend advertises its request budget through `X-RateLimit-*` headers on every response
//! and, once the budget is exhausted, answers with HTTP 429 and a JSON body whose nested `error`
//! object carries `message`, `limit`, `retry_after`, and `reset_at`. [`RateLimitInfo`] normalizes
//! both sources into a single snapshot.

// crates.io
use http::{HeaderMap, header::RETRY_AFTER};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Maximum requests allowed in the current window.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Epoch seconds at which the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Snapshot of the backend's rate-limit window derived from a single response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitInfo {
	/// Max requests allowed in the current window.
	pub limit: u64,
	/// Requests left in the current window; always `0` for a 429.
	pub remaining: u64,
	/// Epoch seconds at which the window resets.
	pub reset_at: i64,
	/// Server-suggested backoff in seconds.
	pub retry_after: Option<u64>,
}
impl RateLimitInfo {
	/// Backoff assumed when a 429 body cannot be parsed.
	pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

	/// Builds the snapshot of an exhausted window.
	pub fn exhausted(limit: u64, reset_at: i64, retry_after: Option<u64>) -> Self {
		Self { limit, remaining: 0, reset_at, retry_after }
	}

	/// Reads `X-RateLimit-*` and `Retry-After` headers.
	///
	/// Returns `None` unless the response advertises a limit or a remaining budget.
	pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
		let limit = header_number::<u64>(headers, LIMIT_HEADER);
		let remaining = header_number::<u64>(headers, REMAINING_HEADER);

		if limit.is_none() && remaining.is_none() {
			return None;
		}

		Some(Self {
			limit: limit.unwrap_or_default(),
			remaining: remaining.unwrap_or_default(),
			reset_at: header_number(headers, RESET_HEADER).unwrap_or_default(),
			retry_after: parse_retry_after(headers),
		})
	}

	/// Builds the snapshot for a 429 response from its raw body and headers.
	///
	/// A body that is not valid JSON is treated as the default rejection
	/// (`limit = 0`, `retry_after = 60`, `reset_at = 0`). Each field missing from a valid body, or
	/// carrying a value that is not a non-negative number, falls back to the corresponding header.
	pub fn from_rejection(body: &[u8], headers: &HeaderMap) -> (Self, Option<String>) {
		let Some(parsed) = ErrorBody::parse(body) else {
			return (Self::exhausted(0, 0, Some(Self::DEFAULT_RETRY_AFTER_SECS)), None);
		};
		let message = parsed.error_message().or_else(|| parsed.detail_message());
		let info = Self::exhausted(
			parsed
				.error_field("limit", json_u64)
				.or_else(|| header_number(headers, LIMIT_HEADER))
				.unwrap_or_default(),
			parsed
				.error_field("reset_at", json_i64)
				.or_else(|| header_number(headers, RESET_HEADER))
				.unwrap_or_default(),
			parsed.error_field("retry_after", json_u64).or_else(|| parse_retry_after(headers)),
		);

		(info, message)
	}

	/// Instant at which the window resets, if representable.
	pub fn reset_time(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.reset_at).ok()
	}

	/// Suggested backoff as a duration.
	pub fn retry_after_duration(&self) -> Option<Duration> {
		self.retry_after.map(|secs| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
	}

	/// Time left until the window resets, measured from `now`; zero once it has passed.
	pub fn until_reset(&self, now: OffsetDateTime) -> Duration {
		match self.reset_time() {
			Some(reset) if reset > now => reset - now,
			_ => Duration::ZERO,
		}
	}

	/// Whether the window has no budget left.
	pub fn is_exhausted(&self) -> bool {
		self.remaining == 0
	}
}

/// Error payload returned by the backend for non-2xx responses.
///
/// Fields are read one by one so a sibling of an unexpected type never hides a usable `detail` or
/// rate-limit value.
#[derive(Clone, Debug, Default)]
pub(crate) struct ErrorBody {
	detail: Option<Value>,
	error: Option<Map<String, Value>>,
}
impl ErrorBody {
	/// Parses an error body; `None` when the body is not JSON at all.
	pub(crate) fn parse(body: &[u8]) -> Option<Self> {
		let Value::Object(mut fields) = serde_json::from_slice::<Value>(body).ok()? else {
			return Some(Self::default());
		};
		let error = match fields.remove("error") {
			Some(Value::Object(error)) => Some(error),
			_ => None,
		};

		Some(Self { detail: fields.remove("detail"), error })
	}

	/// Parses an error body, substituting the empty shape for anything that is not JSON.
	pub(crate) fn parse_lenient(body: &[u8]) -> Self {
		Self::parse(body).unwrap_or_default()
	}

	/// `detail` rendered as a message; non-string values become compact JSON.
	pub(crate) fn detail_message(&self) -> Option<String> {
		self.detail.as_ref().and_then(render_message)
	}

	/// Nested `error.message`.
	pub(crate) fn error_message(&self) -> Option<String> {
		self.error.as_ref()?.get("message").and_then(render_message)
	}

	fn error_field<T>(&self, name: &str, read: fn(&Value) -> Option<T>) -> Option<T> {
		self.error.as_ref()?.get(name).and_then(read)
	}
}

// Null and empty strings carry no message.
fn render_message(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) if text.trim().is_empty() => None,
		Value::String(text) => Some(text.to_owned()),
		other => Some(other.to_string()),
	}
}

fn json_u64(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64().or_else(|| {
			number.as_f64().filter(|raw| raw.is_finite() && *raw >= 0.0).map(|raw| raw as u64)
		}),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn json_i64(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number
			.as_i64()
			.or_else(|| number.as_f64().filter(|raw| raw.is_finite()).map(|raw| raw as i64)),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn header_number<T>(headers: &HeaderMap, name: &str) -> Option<T>
where
	T: FromStr,
{
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(secs);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return u64::try_from(delta.whole_seconds()).ok();
		}
	}

	None
}
