//! Error types for provider adapter operations

use thiserror::Error;

/// OAuth error codes that mean the grant itself is dead and the user must
/// re-authorize. Everything else coming back from a token endpoint is
/// treated as retryable.
pub const PERMANENT_OAUTH_ERRORS: &[&str] = &[
	"invalid_grant",
	"invalid_client",
	"unauthorized_client",
	"access_denied",
];

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A provider name that does not match any configured integration.
#[derive(Debug, Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProviderError(pub String);

/// Errors surfaced by provider adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("provider returned status {status}: {body}")]
	Status { status: u16, body: String },

	#[error("request timed out after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("OAuth error '{code}': {description}")]
	OAuth { code: String, description: String },

	#[error("invalid response from provider: {reason}")]
	InvalidResponse { reason: String },

	#[error("invalid request: {reason}")]
	InvalidRequest { reason: String },
}

impl ProviderError {
	/// HTTP status behind this error, when one exists.
	pub fn status_code(&self) -> Option<u16> {
		match self {
			ProviderError::Status { status, .. } => Some(*status),
			ProviderError::Http(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	/// True when the provider rejected the credential itself (401-class),
	/// which is the trigger for the refresh-and-retry path.
	pub fn is_auth_error(&self) -> bool {
		matches!(self.status_code(), Some(401))
	}

	/// True when the OAuth error body names a code that cannot be
	/// recovered without the user re-authorizing.
	pub fn is_permanent_oauth(&self) -> bool {
		match self {
			ProviderError::OAuth { code, .. } => {
				PERMANENT_OAUTH_ERRORS.contains(&code.as_str())
			},
			_ => false,
		}
	}

	/// True for failures expected to succeed on retry: network errors,
	/// timeouts, rate limiting and provider-side 5xx.
	pub fn is_transient(&self) -> bool {
		match self {
			ProviderError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
			ProviderError::Timeout { .. } => true,
			ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
			ProviderError::OAuth { .. } => !self.is_permanent_oauth(),
			ProviderError::InvalidResponse { .. } | ProviderError::InvalidRequest { .. } => false,
		}
	}

	/// Build an error from a non-success HTTP response.
	pub fn from_http_failure(status: u16, body: String) -> Self {
		ProviderError::Status { status, body }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_extraction() {
		let err = ProviderError::from_http_failure(401, "unauthorized".to_string());
		assert_eq!(err.status_code(), Some(401));
		assert!(err.is_auth_error());
		assert!(!err.is_transient());
	}

	#[test]
	fn rate_limit_and_server_errors_are_transient() {
		assert!(ProviderError::from_http_failure(429, String::new()).is_transient());
		assert!(ProviderError::from_http_failure(503, String::new()).is_transient());
		assert!(!ProviderError::from_http_failure(400, String::new()).is_transient());
	}

	#[test]
	fn permanent_oauth_codes_are_classified() {
		for code in PERMANENT_OAUTH_ERRORS {
			let err = ProviderError::OAuth {
				code: code.to_string(),
				description: String::new(),
			};
			assert!(err.is_permanent_oauth(), "{code} should be permanent");
			assert!(!err.is_transient());
		}

		let temporary = ProviderError::OAuth {
			code: "temporarily_unavailable".to_string(),
			description: String::new(),
		};
		assert!(!temporary.is_permanent_oauth());
		assert!(temporary.is_transient());
	}

	#[test]
	fn timeout_is_transient() {
		let err = ProviderError::Timeout { timeout_ms: 5000 };
		assert!(err.is_transient());
		assert_eq!(err.status_code(), None);
	}
}
