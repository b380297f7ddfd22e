//! Provider contract: the two external analytics integrations
//!
//! A provider is an external OAuth-protected analytics API. Each adapter
//! implements [`ProviderAdapter`] for one provider; everything above the
//! adapter layer is provider-agnostic.

pub mod dto;
pub mod errors;
pub mod traits;

pub use dto::{TokenErrorResponse, TokenResponse};
pub use errors::{ProviderError, ProviderResult, UnknownProviderError};
pub use traits::ProviderAdapter;

use crate::models::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The analytics providers the engine synchronizes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
	/// Location profile metrics: impressions, calls, website clicks,
	/// direction requests.
	LocationInsights,
	/// Invoicing analytics: daily invoiced and collected totals.
	Invoicing,
}

impl ProviderKind {
	pub const ALL: [ProviderKind; 2] = [ProviderKind::LocationInsights, ProviderKind::Invoicing];

	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderKind::LocationInsights => "location-insights",
			ProviderKind::Invoicing => "invoicing",
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderKind {
	type Err = UnknownProviderError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"location-insights" => Ok(ProviderKind::LocationInsights),
			"invoicing" => Ok(ProviderKind::Invoicing),
			other => Err(UnknownProviderError(other.to_string())),
		}
	}
}

/// Runtime configuration handed to an adapter on every call.
///
/// Built once from settings at startup; adapters hold no credentials of
/// their own.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
	pub kind: ProviderKind,
	/// OAuth client id registered with the provider.
	pub client_id: String,
	/// OAuth client secret, resolved from the environment at load time.
	pub client_secret: SecretString,
	/// User-facing authorization page.
	pub auth_url: String,
	/// Token endpoint for code exchange and refresh.
	pub token_url: String,
	/// Base URL of the analytics API.
	pub api_base_url: String,
	/// Redirect URI registered for the OAuth callback.
	pub redirect_uri: String,
	/// Scopes requested during authorization.
	pub scopes: Vec<String>,
	/// Per-request timeout for provider calls.
	pub timeout_ms: u64,
}

impl ProviderConfig {
	pub fn scope_param(&self) -> String {
		self.scopes.join(" ")
	}
}
