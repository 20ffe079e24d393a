//! Client configuration: backend base URL, default deadline, and user agent.

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";
/// Base URL used when [`API_URL_ENV`] is unset or empty.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings shared by every request an [`ApiClient`](crate::client::ApiClient) issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL that endpoints are appended to.
	pub base_url: Url,
	/// Deadline applied when a request does not set its own.
	pub timeout: Option<StdDuration>,
	/// `User-Agent` sent by the default reqwest transport.
	pub user_agent: String,
}
impl ClientConfig {
	/// Reads the base URL from [`API_URL_ENV`], falling back to [`DEFAULT_API_URL`].
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Same as [`from_env`](Self::from_env) with a caller-supplied variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: FnOnce(&str) -> Option<String>,
	{
		match lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
			Some(value) => Self::default().with_base_url(&value),
			None => Ok(Self::default()),
		}
	}

	/// Replaces the base URL.
	pub fn with_base_url(mut self, value: &str) -> Result<Self, ConfigError> {
		let value = value.trim();

		self.base_url = Url::parse(value)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: value.to_owned(), source })?;

		Ok(self)
	}

	/// Sets the default deadline.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the user agent.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Appends `endpoint` to the base URL, keeping base paths and endpoint query strings.
	pub fn resolve(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let path = endpoint.trim_start_matches('/');

		Url::parse(&format!("{base}/{path}")).map_err(|source| ConfigError::InvalidEndpoint {
			endpoint: endpoint.to_owned(),
			source,
		})
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: Url::parse(DEFAULT_API_URL).expect("Default API URL must be valid."),
			timeout: None,
			user_agent: concat!("grc-api-client/", env!("CARGO_PKG_VERSION")).into(),
		}
	}
}
