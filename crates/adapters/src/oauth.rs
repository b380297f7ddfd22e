//! OAuth token endpoint client shared by both provider adapters
//!
//! Handles the two RFC 6749 grants the engine uses: `authorization_code`
//! during connect and `refresh_token` afterwards. Error bodies are parsed
//! into the typed OAuth error so the token service can classify them as
//! permanent or transient.

use crate::client::map_request_error;
use clinsight_types::providers::{TokenErrorResponse, TokenResponse};
use clinsight_types::{ProviderConfig, ProviderError, ProviderResult, SecretString, TokenGrant};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Exchange an authorization code for a token grant.
pub async fn exchange_code(
	client: &Client,
	config: &ProviderConfig,
	code: &str,
	realm_id: Option<&str>,
) -> ProviderResult<TokenGrant> {
	debug!(provider = %config.kind, "exchanging authorization code");

	let params = [
		("grant_type", "authorization_code"),
		("code", code),
		("redirect_uri", config.redirect_uri.as_str()),
	];
	let grant = request_token(client, config, &params).await?;

	Ok(TokenGrant {
		realm_id: realm_id.map(str::to_string),
		..grant
	})
}

/// Obtain a fresh access token from a refresh token.
pub async fn refresh(
	client: &Client,
	config: &ProviderConfig,
	refresh_token: &SecretString,
) -> ProviderResult<TokenGrant> {
	debug!(provider = %config.kind, "refreshing access token");

	let params = [
		("grant_type", "refresh_token"),
		("refresh_token", refresh_token.expose_secret()),
	];
	request_token(client, config, &params).await
}

async fn request_token(
	client: &Client,
	config: &ProviderConfig,
	params: &[(&str, &str)],
) -> ProviderResult<TokenGrant> {
	let response = client
		.post(&config.token_url)
		.timeout(Duration::from_millis(config.timeout_ms))
		.basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
		.form(params)
		.send()
		.await
		.map_err(|e| map_request_error(e, config.timeout_ms))?;

	let status = response.status();
	let body = response
		.text()
		.await
		.map_err(|e| map_request_error(e, config.timeout_ms))?;

	if !status.is_success() {
		return Err(parse_token_failure(status.as_u16(), body));
	}

	let parsed: TokenResponse =
		serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
			reason: format!("malformed token response: {}", e),
		})?;

	Ok(TokenGrant {
		access_token: SecretString::from(parsed.access_token),
		refresh_token: parsed.refresh_token.map(SecretString::from),
		expires_in: parsed.expires_in,
		realm_id: None,
	})
}

/// Prefer the RFC 6749 error body over the bare status; token endpoints
/// return 400 for both dead grants and malformed requests, so the `error`
/// code is the only reliable signal.
fn parse_token_failure(status: u16, body: String) -> ProviderError {
	match serde_json::from_str::<TokenErrorResponse>(&body) {
		Ok(oauth) => ProviderError::OAuth {
			code: oauth.error,
			description: oauth.error_description.unwrap_or_default(),
		},
		Err(_) => ProviderError::from_http_failure(status, body),
	}
}
