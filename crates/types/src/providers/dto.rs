//! Wire types shared by both OAuth token endpoints
//!
//! Provider-specific metric payloads stay private to their adapters; only
//! the token grant wire format is common enough to live here.

use serde::Deserialize;

/// Successful token endpoint response (authorization_code or refresh_token
/// grant).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	/// Some providers rotate the refresh token on every grant, some omit it
	/// entirely on refresh. Absence means "keep using the old one".
	#[serde(default)]
	pub refresh_token: Option<String>,
	#[serde(default = "default_expires_in")]
	pub expires_in: i64,
	#[serde(default)]
	pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
	3600
}

/// RFC 6749 error body returned by token endpoints on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
	pub error: String,
	#[serde(default)]
	pub error_description: Option<String>,
}
