//! Shared HTTP client construction for provider adapters

use clinsight_types::{ProviderError, ProviderResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Connect timeout applied to every provider call; per-request timeouts come
/// from the provider configuration.
const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Build the HTTP client an adapter holds for its lifetime.
pub fn build_client() -> ProviderResult<Client> {
	let mut headers = HeaderMap::new();
	headers.insert("Accept", HeaderValue::from_static("application/json"));
	headers.insert("User-Agent", HeaderValue::from_static("clinsight/0.1"));

	let client = Client::builder()
		.default_headers(headers)
		.connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
		.build()
		.map_err(ProviderError::Http)?;

	Ok(client)
}

/// Map a reqwest timeout onto the explicit timeout variant so the retry
/// logic upstream sees it as transient.
pub fn map_request_error(err: reqwest::Error, timeout_ms: u64) -> ProviderError {
	if err.is_timeout() {
		ProviderError::Timeout { timeout_ms }
	} else {
		ProviderError::Http(err)
	}
}
