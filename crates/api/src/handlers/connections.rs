//! Connection management handlers: connect, callback, status, refresh,
//! disconnect

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use clinsight_service::ConnectPrompt;
use clinsight_types::{ConnectionStatus, RefreshOutcome};
use serde::Deserialize;
use tracing::debug;

use crate::handlers::common::{insights_error, parse_provider, ApiError};
use crate::state::AppState;

/// GET /v1/tenants/{tenant_id}/connections/{provider}/connect
///
/// Issue the provider authorization URL the portal redirects the user to.
pub async fn connect(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
) -> Result<Json<ConnectPrompt>, ApiError> {
	let provider = parse_provider(&provider)?;
	debug!(%tenant_id, %provider, "connect requested");
	let prompt = state
		.token_service
		.authorize_url(&tenant_id, provider)
		.await
		.map_err(insights_error)?;
	Ok(Json(prompt))
}

/// Query parameters a provider appends to the OAuth redirect.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackQuery {
	pub code: String,
	pub state: String,
	/// Company realm some providers include alongside the code.
	pub realm_id: Option<String>,
}

/// GET /v1/connections/{provider}/callback
///
/// OAuth redirect target; public because the provider calls it directly.
pub async fn callback(
	State(state): State<AppState>,
	Path(provider): Path<String>,
	Query(query): Query<CallbackQuery>,
) -> Result<Json<ConnectionStatus>, ApiError> {
	let provider = parse_provider(&provider)?;
	let status = state
		.token_service
		.complete_callback(
			provider,
			&query.state,
			&query.code,
			query.realm_id.as_deref(),
		)
		.await
		.map_err(insights_error)?;
	Ok(Json(status))
}

/// GET /v1/tenants/{tenant_id}/connections/{provider}/status
pub async fn connection_status(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
) -> Result<Json<ConnectionStatus>, ApiError> {
	let provider = parse_provider(&provider)?;
	let status = state
		.token_service
		.status(&tenant_id, provider)
		.await
		.map_err(insights_error)?;
	Ok(Json(status))
}

/// POST /v1/tenants/{tenant_id}/connections/{provider}/refresh
///
/// Force a token refresh regardless of the current expiry.
pub async fn refresh_connection(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
) -> Result<Json<RefreshOutcome>, ApiError> {
	let provider = parse_provider(&provider)?;
	let outcome = state
		.token_service
		.force_refresh(&tenant_id, provider)
		.await
		.map_err(insights_error)?;
	Ok(Json(outcome))
}

/// DELETE /v1/tenants/{tenant_id}/connections/{provider}
pub async fn disconnect(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ConnectionStatus>), ApiError> {
	let provider = parse_provider(&provider)?;
	let status = state
		.token_service
		.disconnect(&tenant_id, provider)
		.await
		.map_err(insights_error)?;
	Ok((StatusCode::OK, Json(status)))
}
