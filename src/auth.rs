//! Bearer token wrapper that redacts the credential.

// self
use crate::_prelude::*;

/// Redacted bearer token supplied by the caller's auth store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken(String);
impl BearerToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Value for the `Authorization` header.
	pub(crate) fn authorization_value(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for BearerToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for BearerToken {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for BearerToken {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BearerToken").field(&"<redacted>").finish()
	}
}
impl Display for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
