//! Error taxonomy for the insights pipeline

use crate::credentials::{TokenError, TokenErrorKind};
use crate::providers::{ProviderKind, UnknownProviderError};
use crate::storage::StorageError;
use thiserror::Error;

pub type InsightsResult<T> = Result<T, InsightsError>;

/// Validation failures rejected before any network or storage call.
#[derive(Debug, Error)]
pub enum InsightsValidationError {
	#[error("tenant id must not be empty")]
	EmptyTenantId,

	#[error("invalid date range: {reason}")]
	InvalidDateRange { reason: String },

	#[error("invalid rolling window: {days} days")]
	InvalidDays { days: u32 },

	#[error("date range spans {days} days, maximum is {max_days}")]
	RangeTooLong { days: i64, max_days: i64 },

	#[error(transparent)]
	UnknownProvider(#[from] UnknownProviderError),
}

/// Errors surfaced by the insights pipeline and connection management.
#[derive(Debug, Error)]
pub enum InsightsError {
	#[error("validation failed: {0}")]
	Validation(#[from] InsightsValidationError),

	#[error("tenant not found: {tenant_id}")]
	TenantNotFound { tenant_id: String },

	#[error("provider {provider} is not connected for tenant {tenant_id}")]
	NotConnected {
		tenant_id: String,
		provider: ProviderKind,
	},

	#[error("provider {provider} is not configured on this instance")]
	ProviderNotConfigured { provider: ProviderKind },

	#[error("authorization revoked, tenant must reconnect: {reason}")]
	AuthRevoked { reason: String },

	#[error("provider rate limited the request")]
	RateLimited,

	#[error("provider unavailable: {reason}")]
	Upstream {
		reason: String,
		/// Whether a retry is expected to help, carried over from the
		/// provider error so retry loops never act on a permanent failure.
		transient: bool,
	},

	#[error("no pending authorization matches state '{state}'")]
	InvalidAuthState { state: String },

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),
}

impl From<TokenError> for InsightsError {
	fn from(err: TokenError) -> Self {
		match err {
			TokenError::TenantNotFound { tenant_id } => InsightsError::TenantNotFound { tenant_id },
			TokenError::NotConnected {
				tenant_id,
				provider,
			} => InsightsError::NotConnected {
				tenant_id,
				provider,
			},
			TokenError::Revoked { reason } => InsightsError::AuthRevoked { reason },
			TokenError::Refresh { source, kind } => match kind {
				TokenErrorKind::Permanent => InsightsError::AuthRevoked {
					reason: source.to_string(),
				},
				TokenErrorKind::Transient => {
					if source.status_code() == Some(429) {
						InsightsError::RateLimited
					} else {
						InsightsError::Upstream {
							transient: source.is_transient(),
							reason: source.to_string(),
						}
					}
				},
			},
			TokenError::Storage(err) => InsightsError::Storage(err),
		}
	}
}

impl InsightsError {
	/// True when the caller should re-run the OAuth connect flow.
	pub fn requires_reauth(&self) -> bool {
		matches!(
			self,
			InsightsError::AuthRevoked { .. } | InsightsError::NotConnected { .. }
		)
	}
}
