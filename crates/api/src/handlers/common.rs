use axum::{http::StatusCode, response::Json};
use clinsight_types::{InsightsError, InsightsValidationError, ProviderKind};
use serde::Serialize;

/// Error response format shared by handlers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
	pub timestamp: i64,
	/// Present and true when the caller should restart the OAuth connect
	/// flow for this provider.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub requires_reauth: Option<bool>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: &str, message: String) -> ApiError {
	(
		status,
		Json(ErrorResponse {
			error: error.to_string(),
			message,
			timestamp: chrono::Utc::now().timestamp(),
			requires_reauth: None,
		}),
	)
}

/// Map a pipeline error onto a status code and wire error code.
pub fn insights_error(err: InsightsError) -> ApiError {
	let requires_reauth = err.requires_reauth();
	let (status, code) = match &err {
		InsightsError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
		InsightsError::TenantNotFound { .. } => (StatusCode::NOT_FOUND, "TENANT_NOT_FOUND"),
		InsightsError::NotConnected { .. } => (StatusCode::CONFLICT, "NOT_CONNECTED"),
		InsightsError::ProviderNotConfigured { .. } => {
			(StatusCode::NOT_IMPLEMENTED, "PROVIDER_NOT_CONFIGURED")
		},
		InsightsError::AuthRevoked { .. } => (StatusCode::UNAUTHORIZED, "AUTH_REVOKED"),
		InsightsError::RateLimited => (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_RATE_LIMITED"),
		InsightsError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE"),
		InsightsError::InvalidAuthState { .. } => (StatusCode::BAD_REQUEST, "INVALID_AUTH_STATE"),
		InsightsError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
	};

	(
		status,
		Json(ErrorResponse {
			error: code.to_string(),
			message: err.to_string(),
			timestamp: chrono::Utc::now().timestamp(),
			requires_reauth: requires_reauth.then_some(true),
		}),
	)
}

/// Parse the provider path segment.
pub fn parse_provider(raw: &str) -> Result<ProviderKind, ApiError> {
	raw.parse().map_err(|e| {
		insights_error(InsightsError::Validation(
			InsightsValidationError::UnknownProvider(e),
		))
	})
}
