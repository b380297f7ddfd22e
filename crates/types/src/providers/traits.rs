//! Core adapter trait implemented once per external provider

use super::{ProviderConfig, ProviderKind, ProviderResult};
use crate::credentials::TokenGrant;
use crate::insights::{FetchWindow, WindowSeries};
use crate::models::SecretString;
use async_trait::async_trait;
use std::fmt::Debug;

/// One external analytics integration.
///
/// Adapters are stateless: every call receives the runtime configuration
/// and the credential material it needs. Token persistence, refresh policy
/// and batching all live above this trait.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
	/// Which provider this adapter talks to.
	fn kind(&self) -> ProviderKind;

	/// Build the user-facing authorization URL carrying the given opaque
	/// `state` value.
	fn authorize_url(&self, config: &ProviderConfig, state: &str) -> ProviderResult<String>;

	/// Exchange an authorization code for a token grant. `realm_id` is the
	/// provider-assigned company identifier some callbacks carry.
	async fn exchange_code(
		&self,
		config: &ProviderConfig,
		code: &str,
		realm_id: Option<&str>,
	) -> ProviderResult<TokenGrant>;

	/// Obtain a fresh access token from a refresh token.
	async fn refresh_token(
		&self,
		config: &ProviderConfig,
		refresh_token: &SecretString,
	) -> ProviderResult<TokenGrant>;

	/// Identify the provider-side resource (location, company realm) that
	/// metric fetches are scoped to. Returns `None` when the callback
	/// already supplied it.
	async fn discover_resource(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
	) -> ProviderResult<Option<String>> {
		Ok(None)
	}

	/// Fetch the metric series for one date window.
	async fn fetch_window(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
		window: &FetchWindow,
	) -> ProviderResult<WindowSeries>;

	/// Cheap single-metric fetch used as a post-connect diagnostic. A
	/// failure here is reported by the caller, never acted on.
	async fn probe(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
	) -> ProviderResult<()>;
}
