//! Connection credentials and the token lifecycle state machine
//!
//! One credential slot exists per tenant and provider. It is mutated only
//! by the token service; fetch logic never reads tokens directly from it.

use crate::models::SecretString;
use crate::providers::{ProviderError, ProviderKind};
use crate::storage::StorageError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

pub type TokenResult<T> = Result<T, TokenError>;

/// Tokens returned by a provider for either grant type.
#[derive(Debug, Clone)]
pub struct TokenGrant {
	pub access_token: SecretString,
	/// Present when the provider rotated the refresh token. Absent means
	/// the previously issued one is still valid.
	pub refresh_token: Option<SecretString>,
	/// Access token lifetime in seconds.
	pub expires_in: i64,
	/// Company realm passed back by some providers during code exchange.
	pub realm_id: Option<String>,
}

/// Where a credential sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
	Disconnected,
	ConnectedValid,
	ExpiringSoon,
	NeedsReauth,
}

/// Classification of a token failure.
///
/// Permanent failures flip the credential to needs-reauth; transient
/// failures leave connection state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
	Permanent,
	Transient,
}

/// Stored OAuth state for one tenant and provider.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionCredential {
	pub access_token: Option<SecretString>,
	pub refresh_token: Option<SecretString>,
	/// Absolute expiry of the access token.
	pub expires_at: Option<DateTime<Utc>>,
	pub connected: bool,
	pub needs_reauth: bool,
	/// Provider-side location or company realm the metrics are scoped to.
	pub resource_id: Option<String>,
	/// Completion time of the last successful pipeline run.
	pub last_synced: Option<DateTime<Utc>>,
}

impl ConnectionCredential {
	pub fn disconnected() -> Self {
		Self::default()
	}

	/// Build a freshly connected credential from a code-exchange grant.
	pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
		let mut credential = Self::disconnected();
		credential.apply_grant(grant, now);
		credential
	}

	/// Apply a grant to this credential.
	///
	/// The refresh token is only replaced when the grant carries one; a
	/// provider omitting it on refresh must never null out the stored
	/// token.
	pub fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
		self.access_token = Some(grant.access_token);
		if let Some(refresh_token) = grant.refresh_token {
			self.refresh_token = Some(refresh_token);
		}
		if let Some(realm_id) = grant.realm_id {
			self.resource_id = Some(realm_id);
		}
		self.expires_at = Some(now + Duration::seconds(grant.expires_in));
		self.connected = true;
		self.needs_reauth = false;
	}

	/// Permanent auth failure: the grant is dead until the user
	/// re-authorizes.
	pub fn mark_needs_reauth(&mut self) {
		self.connected = false;
		self.needs_reauth = true;
	}

	/// Explicit disconnect wipes every credential field.
	pub fn disconnect(&mut self) {
		*self = Self::disconnected();
	}

	/// Current lifecycle state given the configured expiry buffer.
	pub fn state(&self, now: DateTime<Utc>, buffer: Duration) -> ConnectionState {
		if self.needs_reauth {
			return ConnectionState::NeedsReauth;
		}
		if !self.connected {
			return ConnectionState::Disconnected;
		}
		match self.expires_at {
			Some(expires_at) if now + buffer >= expires_at => ConnectionState::ExpiringSoon,
			Some(_) => ConnectionState::ConnectedValid,
			None => ConnectionState::ExpiringSoon,
		}
	}

	/// True when the access token can be used as-is.
	pub fn token_is_current(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
		self.state(now, buffer) == ConnectionState::ConnectedValid && self.access_token.is_some()
	}

	pub fn status(&self, now: DateTime<Utc>, buffer: Duration) -> ConnectionStatus {
		ConnectionStatus {
			connected: self.connected,
			needs_reauth: self.needs_reauth,
			state: self.state(now, buffer),
			last_synced: self.last_synced,
			token_expiry: self.expires_at,
		}
	}
}

/// Connection status as reported by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
	pub connected: bool,
	pub needs_reauth: bool,
	pub state: ConnectionState,
	pub last_synced: Option<DateTime<Utc>>,
	pub token_expiry: Option<DateTime<Utc>>,
}

/// Result of a manual refresh request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
	pub refreshed: bool,
	pub token_expiry: Option<DateTime<Utc>>,
}

/// Errors from the token lifecycle.
#[derive(Debug, Error)]
pub enum TokenError {
	#[error("tenant not found: {tenant_id}")]
	TenantNotFound { tenant_id: String },

	#[error("provider {provider} is not connected for tenant {tenant_id}")]
	NotConnected {
		tenant_id: String,
		provider: ProviderKind,
	},

	#[error("authorization revoked, tenant must reconnect: {reason}")]
	Revoked { reason: String },

	#[error("token refresh failed: {source}")]
	Refresh {
		#[source]
		source: ProviderError,
		kind: TokenErrorKind,
	},

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),
}

impl TokenError {
	pub fn kind(&self) -> TokenErrorKind {
		match self {
			TokenError::TenantNotFound { .. } => TokenErrorKind::Permanent,
			TokenError::NotConnected { .. } => TokenErrorKind::Permanent,
			TokenError::Revoked { .. } => TokenErrorKind::Permanent,
			TokenError::Refresh { kind, .. } => *kind,
			TokenError::Storage(_) => TokenErrorKind::Transient,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn grant(refresh: Option<&str>) -> TokenGrant {
		TokenGrant {
			access_token: SecretString::from("access-1"),
			refresh_token: refresh.map(SecretString::from),
			expires_in: 3600,
			realm_id: None,
		}
	}

	#[test]
	fn grant_without_refresh_token_retains_existing() {
		let now = Utc::now();
		let mut credential = ConnectionCredential::from_grant(grant(Some("refresh-1")), now);
		assert!(credential.connected);

		credential.apply_grant(grant(None), now);
		assert_eq!(
			credential.refresh_token.as_ref().map(|t| t.expose_secret()),
			Some("refresh-1")
		);
	}

	#[test]
	fn grant_with_refresh_token_rotates() {
		let now = Utc::now();
		let mut credential = ConnectionCredential::from_grant(grant(Some("refresh-1")), now);
		credential.apply_grant(grant(Some("refresh-2")), now);
		assert_eq!(
			credential.refresh_token.as_ref().map(|t| t.expose_secret()),
			Some("refresh-2")
		);
	}

	#[test]
	fn state_machine_transitions() {
		let now = Utc::now();
		let buffer = Duration::minutes(10);

		let mut credential = ConnectionCredential::disconnected();
		assert_eq!(credential.state(now, buffer), ConnectionState::Disconnected);

		credential.apply_grant(grant(Some("refresh-1")), now);
		assert_eq!(
			credential.state(now, buffer),
			ConnectionState::ConnectedValid
		);

		// Within the buffer of expiry.
		credential.expires_at = Some(now + Duration::minutes(5));
		assert_eq!(credential.state(now, buffer), ConnectionState::ExpiringSoon);

		credential.mark_needs_reauth();
		assert_eq!(credential.state(now, buffer), ConnectionState::NeedsReauth);
		assert!(!credential.connected);
		assert!(credential.needs_reauth);

		credential.disconnect();
		assert_eq!(credential.state(now, buffer), ConnectionState::Disconnected);
		assert!(credential.access_token.is_none());
		assert!(credential.refresh_token.is_none());
	}

	#[test]
	fn realm_id_survives_refresh_grants() {
		let now = Utc::now();
		let mut with_realm = grant(Some("refresh-1"));
		with_realm.realm_id = Some("realm-42".to_string());

		let mut credential = ConnectionCredential::from_grant(with_realm, now);
		assert_eq!(credential.resource_id.as_deref(), Some("realm-42"));

		credential.apply_grant(grant(None), now);
		assert_eq!(credential.resource_id.as_deref(), Some("realm-42"));
	}
}
