//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
// self
use grc_api_client::{
	client::ApiClient, config::ClientConfig, events::RateLimitEvents, rate_limit::RateLimitInfo,
};
#[cfg(feature = "reqwest")]
use grc_api_client::{reqwest::Client as ReqwestClient, transport::ReqwestTransport};

/// Client type alias used by reqwest-backed integration tests.
#[cfg(feature = "reqwest")]
pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_transport() -> ReqwestTransport {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

/// Constructs an [`ApiClient`] pointed at `base_url` together with the event registry it
/// broadcasts rate-limit rejections to.
#[cfg(feature = "reqwest")]
pub fn build_reqwest_test_client(base_url: &str) -> (ReqwestTestClient, RateLimitEvents) {
	let config = ClientConfig::default()
		.with_base_url(base_url)
		.expect("Mock server URL should be a valid base URL.");
	let events = RateLimitEvents::default();
	let client: ReqwestTestClient =
		ApiClient::with_transport(config, test_reqwest_transport()).with_events(events.clone());

	(client, events)
}

/// Base URL used by tests that never touch the network.
pub fn offline_config() -> ClientConfig {
	ClientConfig::default()
		.with_base_url("https://grc.example.com/api")
		.expect("Offline base URL should parse.")
}

/// Subscribes a listener that records every broadcast into the returned vector.
pub fn record_rate_limits(events: &RateLimitEvents) -> Arc<Mutex<Vec<RateLimitInfo>>> {
	let seen = <Arc<Mutex<Vec<RateLimitInfo>>>>::default();
	let sink = Arc::clone(&seen);

	events.subscribe(move |info| sink.lock().push(info.clone()));

	seen
}
