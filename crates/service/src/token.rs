//! Token lifecycle management
//!
//! One service owns every credential mutation: connect (authorization URL
//! and callback), refresh, disconnect, and the refresh-on-expiry path that
//! every fetch goes through. Refreshes for one `(tenant, provider)` pair
//! are serialized through a per-credential lock so concurrent requests
//! cannot race to refresh and overwrite each other's tokens.

use chrono::{DateTime, Duration, Utc};
use clinsight_adapters::AdapterRegistry;
use clinsight_storage::Storage;
use clinsight_types::{
	ConnectionCredential, ConnectionStatus, InsightsError, InsightsResult, ProviderAdapter,
	ProviderConfig, ProviderError, ProviderKind, RefreshOutcome, SecretString, Tenant, TokenError,
	TokenErrorKind, TokenResult,
};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long an issued authorization state nonce stays redeemable.
const PENDING_STATE_TTL_MINUTES: i64 = 10;

type CredentialKey = (String, ProviderKind);

/// Prompt returned by the connect operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPrompt {
	pub authorization_url: String,
	pub state: String,
}

#[derive(Debug, Clone)]
struct PendingAuth {
	tenant_id: String,
	provider: ProviderKind,
	issued_at: DateTime<Utc>,
}

/// Owns credential state transitions for every tenant and provider.
pub struct TokenService {
	storage: Storage,
	registry: Arc<AdapterRegistry>,
	configs: BTreeMap<ProviderKind, ProviderConfig>,
	/// Refresh this far before the access token's absolute expiry.
	buffer: Duration,
	refresh_locks: DashMap<CredentialKey, Arc<Mutex<()>>>,
	pending_states: DashMap<String, PendingAuth>,
}

impl TokenService {
	pub fn new(
		storage: Storage,
		registry: Arc<AdapterRegistry>,
		configs: BTreeMap<ProviderKind, ProviderConfig>,
		buffer_minutes: i64,
	) -> Self {
		Self {
			storage,
			registry,
			configs,
			buffer: Duration::minutes(buffer_minutes),
			refresh_locks: DashMap::new(),
			pending_states: DashMap::new(),
		}
	}

	/// Runtime configuration for a provider, or the not-configured error.
	pub fn provider_config(&self, provider: ProviderKind) -> InsightsResult<&ProviderConfig> {
		self.configs
			.get(&provider)
			.ok_or(InsightsError::ProviderNotConfigured { provider })
	}

	/// The registered adapter for a provider.
	pub fn adapter_for(&self, provider: ProviderKind) -> InsightsResult<Arc<dyn ProviderAdapter>> {
		self.registry
			.get(provider)
			.ok_or(InsightsError::ProviderNotConfigured { provider })
	}

	fn refresh_lock(&self, tenant_id: &str, provider: ProviderKind) -> Arc<Mutex<()>> {
		self.refresh_locks
			.entry((tenant_id.to_string(), provider))
			.or_default()
			.clone()
	}

	async fn load_tenant(&self, tenant_id: &str) -> TokenResult<Tenant> {
		self.storage
			.get_tenant(tenant_id)
			.await?
			.ok_or_else(|| TokenError::TenantNotFound {
				tenant_id: tenant_id.to_string(),
			})
	}

	// ================================
	// CONNECT FLOW
	// ================================

	/// Issue the provider authorization URL for a tenant. The embedded
	/// state nonce ties the eventual callback back to this tenant.
	pub async fn authorize_url(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<ConnectPrompt> {
		let config = self.provider_config(provider)?;
		let adapter = self.adapter_for(provider)?;
		self.load_tenant(tenant_id).await?;

		let state = Uuid::new_v4().to_string();
		let authorization_url = adapter
			.authorize_url(config, &state)
			.map_err(upstream_error)?;

		self.pending_states.insert(
			state.clone(),
			PendingAuth {
				tenant_id: tenant_id.to_string(),
				provider,
				issued_at: Utc::now(),
			},
		);

		info!(tenant_id, provider = %provider, "issued authorization url");
		Ok(ConnectPrompt {
			authorization_url,
			state,
		})
	}

	/// Redeem an OAuth callback: exchange the code, persist the credential
	/// and transition the connection to connected-valid.
	pub async fn complete_callback(
		&self,
		provider: ProviderKind,
		state: &str,
		code: &str,
		realm_id: Option<&str>,
	) -> InsightsResult<ConnectionStatus> {
		let pending = self
			.pending_states
			.remove(state)
			.map(|(_, pending)| pending)
			.ok_or_else(|| InsightsError::InvalidAuthState {
				state: state.to_string(),
			})?;

		let expired =
			Utc::now() - pending.issued_at > Duration::minutes(PENDING_STATE_TTL_MINUTES);
		if pending.provider != provider || expired {
			return Err(InsightsError::InvalidAuthState {
				state: state.to_string(),
			});
		}

		let config = self.provider_config(provider)?;
		let adapter = self.adapter_for(provider)?;
		let mut tenant = self.load_tenant(&pending.tenant_id).await?;

		let grant = adapter
			.exchange_code(config, code, realm_id)
			.await
			.map_err(upstream_error)?;

		let now = Utc::now();
		let mut credential = tenant
			.credential(provider)
			.cloned()
			.unwrap_or_else(ConnectionCredential::disconnected);
		credential.apply_grant(grant, now);

		if credential.resource_id.is_none() {
			if let Some(access_token) = &credential.access_token {
				credential.resource_id = adapter
					.discover_resource(config, access_token)
					.await
					.map_err(upstream_error)?;
			}
		}

		// Post-connect diagnostic: surfaces scope misconfiguration now
		// instead of at the first dashboard load. The exchange already
		// proved the credential, so a probe failure never fails the
		// callback.
		if let Some(access_token) = &credential.access_token {
			if let Err(e) = adapter
				.probe(config, access_token, credential.resource_id.as_deref())
				.await
			{
				warn!(
					tenant_id = %pending.tenant_id,
					provider = %provider,
					error = %e,
					"post-connect probe failed"
				);
			}
		}

		let status = credential.status(now, self.buffer);
		tenant.set_credential(provider, credential);
		self.storage
			.update_tenant(tenant)
			.await
			.map_err(InsightsError::Storage)?;

		info!(tenant_id = %pending.tenant_id, provider = %provider, "provider connected");
		Ok(status)
	}

	// ================================
	// TOKEN ACCESS
	// ================================

	/// The current access token, refreshing first when expiry is inside
	/// the configured buffer. Fails fast without a network call when the
	/// credential needs re-authorization.
	pub async fn valid_access_token(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<SecretString> {
		self.provider_config(provider)?;

		let lock = self.refresh_lock(tenant_id, provider);
		let _guard = lock.lock().await;

		let tenant = self.load_tenant(tenant_id).await?;
		let credential = self.connected_credential(&tenant, provider)?;

		let now = Utc::now();
		if credential.token_is_current(now, self.buffer) {
			if let Some(token) = credential.access_token {
				return Ok(token);
			}
		}

		self.refresh_locked(tenant, provider, now)
			.await
			.map_err(Into::into)
	}

	/// Run `op` with a valid token; on a 401-class provider error, force
	/// one refresh and retry `op` exactly once.
	pub async fn with_valid_token<T, F, Fut>(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		op: F,
	) -> InsightsResult<T>
	where
		F: Fn(SecretString) -> Fut,
		Fut: Future<Output = Result<T, ProviderError>>,
	{
		let token = self.valid_access_token(tenant_id, provider).await?;
		match op(token).await {
			Ok(value) => Ok(value),
			Err(e) if e.is_auth_error() => {
				debug!(tenant_id, provider = %provider, "401 from provider, forcing token refresh");
				let token = self.refresh_now(tenant_id, provider).await?;
				match op(token).await {
					Ok(value) => Ok(value),
					// A 401 straight after a successful refresh means the
					// provider no longer honors this grant at all.
					Err(e) if e.is_auth_error() => Err(InsightsError::AuthRevoked {
						reason: e.to_string(),
					}),
					Err(e) => Err(upstream_error(e)),
				}
			},
			Err(e) => Err(upstream_error(e)),
		}
	}

	/// Force a refresh regardless of the current token's expiry.
	async fn refresh_now(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<SecretString> {
		let lock = self.refresh_lock(tenant_id, provider);
		let _guard = lock.lock().await;

		let tenant = self.load_tenant(tenant_id).await?;
		self.connected_credential(&tenant, provider)?;
		self.refresh_locked(tenant, provider, Utc::now())
			.await
			.map_err(Into::into)
	}

	fn connected_credential(
		&self,
		tenant: &Tenant,
		provider: ProviderKind,
	) -> TokenResult<ConnectionCredential> {
		let credential = tenant
			.credential(provider)
			.cloned()
			.unwrap_or_else(ConnectionCredential::disconnected);
		if credential.needs_reauth {
			return Err(TokenError::Revoked {
				reason: "credential requires re-authorization".to_string(),
			});
		}
		if !credential.connected {
			return Err(TokenError::NotConnected {
				tenant_id: tenant.tenant_id.clone(),
				provider,
			});
		}
		Ok(credential)
	}

	/// Refresh and persist. Caller holds the credential lock.
	async fn refresh_locked(
		&self,
		mut tenant: Tenant,
		provider: ProviderKind,
		now: DateTime<Utc>,
	) -> TokenResult<SecretString> {
		let tenant_id = tenant.tenant_id.clone();
		let mut credential = self.connected_credential(&tenant, provider)?;
		let refresh_token =
			credential
				.refresh_token
				.clone()
				.ok_or_else(|| TokenError::NotConnected {
					tenant_id: tenant_id.clone(),
					provider,
				})?;

		// Both looked up already by the public entry points.
		let config = match self.configs.get(&provider) {
			Some(config) => config,
			None => {
				return Err(TokenError::NotConnected {
					tenant_id,
					provider,
				})
			},
		};
		let adapter = match self.registry.get(provider) {
			Some(adapter) => adapter,
			None => {
				return Err(TokenError::NotConnected {
					tenant_id,
					provider,
				})
			},
		};

		debug!(tenant_id, provider = %provider, "refreshing access token");
		match adapter.refresh_token(config, &refresh_token).await {
			Ok(grant) => {
				credential.apply_grant(grant, now);
				let token = credential.access_token.clone().ok_or_else(|| {
					TokenError::Refresh {
						source: ProviderError::InvalidResponse {
							reason: "token response carried an empty access token".to_string(),
						},
						kind: TokenErrorKind::Transient,
					}
				})?;
				tenant.set_credential(provider, credential);
				self.storage.update_tenant(tenant).await?;
				Ok(token)
			},
			Err(e) => {
				let kind = classify_refresh_failure(&e);
				if kind == TokenErrorKind::Permanent {
					warn!(tenant_id, provider = %provider, error = %e, "refresh token rejected, marking needs-reauth");
					credential.mark_needs_reauth();
					tenant.set_credential(provider, credential);
					self.storage.update_tenant(tenant).await?;
				}
				Err(TokenError::Refresh { source: e, kind })
			},
		}
	}

	// ================================
	// CONNECTION MANAGEMENT
	// ================================

	/// Manual forced refresh; returns the new expiry.
	pub async fn force_refresh(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<RefreshOutcome> {
		self.provider_config(provider)?;
		self.refresh_now(tenant_id, provider).await?;

		let tenant = self.load_tenant(tenant_id).await?;
		let token_expiry = tenant.credential(provider).and_then(|c| c.expires_at);
		Ok(RefreshOutcome {
			refreshed: true,
			token_expiry,
		})
	}

	pub async fn status(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<ConnectionStatus> {
		let tenant = self.load_tenant(tenant_id).await?;
		let credential = tenant
			.credential(provider)
			.cloned()
			.unwrap_or_else(ConnectionCredential::disconnected);
		Ok(credential.status(Utc::now(), self.buffer))
	}

	/// Null every credential field and transition to disconnected.
	pub async fn disconnect(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<ConnectionStatus> {
		let mut tenant = self.load_tenant(tenant_id).await?;
		tenant.set_credential(provider, ConnectionCredential::disconnected());
		self.storage
			.update_tenant(tenant)
			.await
			.map_err(InsightsError::Storage)?;

		info!(tenant_id, provider = %provider, "provider disconnected");
		self.status(tenant_id, provider).await
	}

	/// Record the completion time of a successful pipeline run.
	pub async fn mark_synced(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		now: DateTime<Utc>,
	) -> InsightsResult<()> {
		let mut tenant = self.load_tenant(tenant_id).await?;
		if let Some(credential) = tenant.credential(provider) {
			let mut credential = credential.clone();
			credential.last_synced = Some(now);
			tenant.set_credential(provider, credential);
			self.storage
				.update_tenant(tenant)
				.await
				.map_err(InsightsError::Storage)?;
		}
		Ok(())
	}

	/// Resource identifier (location or realm) the tenant's metrics are
	/// scoped to.
	pub async fn resource_id(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<Option<String>> {
		let tenant = self.load_tenant(tenant_id).await?;
		Ok(tenant
			.credential(provider)
			.and_then(|c| c.resource_id.clone()))
	}
}

/// Permanent means the grant is dead and only the user can fix it; the
/// dead-grant OAuth codes and a bare 401 from the token endpoint both
/// qualify. Everything else is worth retrying.
fn classify_refresh_failure(err: &ProviderError) -> TokenErrorKind {
	if err.is_permanent_oauth() || err.is_auth_error() {
		TokenErrorKind::Permanent
	} else {
		TokenErrorKind::Transient
	}
}

/// Map a non-auth provider failure onto the pipeline taxonomy, keeping
/// its transience so retry loops only act on failures worth retrying.
pub(crate) fn upstream_error(err: ProviderError) -> InsightsError {
	if err.status_code() == Some(429) {
		InsightsError::RateLimited
	} else {
		InsightsError::Upstream {
			transient: err.is_transient(),
			reason: err.to_string(),
		}
	}
}
