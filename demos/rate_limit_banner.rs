//! Wires a dashboard-style "slow down" banner to the client's rate-limit events.
//!
//! 1. Build an [`ApiClient`] from `NEXT_PUBLIC_API_URL` (defaults to `http://localhost:8000`).
//! 2. Subscribe a listener on the client's [`RateLimitEvents`]; it fires on every HTTP 429 no
//!    matter which call site triggered it.
//! 3. Fetch the incident list and report either the decoded payload, the API error, or the
//!    backoff hint carried by the rate-limit error.
//!
//! Set `GRC_TOKEN` to send a bearer token.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use serde_json::Value;
// self
use grc_api_client::{
	auth::BearerToken, client::ApiClient, config::ClientConfig, error::Error,
	request::RequestOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::from_env()?.with_timeout(Duration::from_secs(10));
	let client = ApiClient::new(config)?;
	let banner = client.events().subscribe(|info| {
		println!(
			"[banner] Too many requests: {} per window, retry in {}s.",
			info.limit,
			info.retry_after.unwrap_or_default()
		);
	});
	let options = RequestOptions::default()
		.maybe_token(std::env::var("GRC_TOKEN").ok().map(BearerToken::new).as_ref());

	match client.request::<Value>("/api/incidents", options).await {
		Ok(incidents) => println!("{incidents:#}"),
		Err(Error::RateLimited(e)) =>
			println!("Backing off until {:?}: {e}.", e.info.reset_time()),
		Err(Error::Api(e)) => println!("Backend answered {}: {e}.", e.status),
		Err(other) => return Err(other.into()),
	}

	if let Some(budget) = client.last_rate_limit() {
		println!("Remaining budget: {}/{}.", budget.remaining, budget.limit);
	}

	banner.unsubscribe();

	Ok(())
}
