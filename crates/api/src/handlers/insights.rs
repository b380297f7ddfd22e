//! Insights handlers: aggregate serving and manual refreshes

use axum::{
	extract::{Path, Query, State},
	response::Json,
};
use chrono::Utc;
use clinsight_types::{AggregateResult, InsightsQuery, InsightsResponse};
use clinsight_service::RefreshAllReport;
use tracing::debug;

use crate::handlers::common::{insights_error, parse_provider, ApiError};
use crate::state::AppState;

/// GET /v1/tenants/{tenant_id}/insights/{provider}
///
/// Serve the aggregate for the requested period, cache-first. Accepts
/// either `start`/`end` or `days`, plus `compare` and `forceRefresh`.
pub async fn get_insights(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
	Query(query): Query<InsightsQuery>,
) -> Result<Json<InsightsResponse>, ApiError> {
	let provider = parse_provider(&provider)?;
	debug!(%tenant_id, %provider, ?query, "insights requested");

	let request = query
		.into_request(
			&tenant_id,
			provider,
			Utc::now().date_naive(),
			state.insights_service.rolling_days_default(),
		)
		.map_err(|e| insights_error(e.into()))?;

	let response = state
		.insights_service
		.get_insights(request)
		.await
		.map_err(insights_error)?;
	Ok(Json(response))
}

/// POST /v1/tenants/{tenant_id}/insights/{provider}/refresh
///
/// Drop the tenant's cached aggregates and recompute the default rolling
/// window from live data.
pub async fn refresh_insights(
	State(state): State<AppState>,
	Path((tenant_id, provider)): Path<(String, String)>,
) -> Result<Json<AggregateResult>, ApiError> {
	let provider = parse_provider(&provider)?;
	let result = state
		.insights_service
		.refresh_tenant(&tenant_id, provider)
		.await
		.map_err(insights_error)?;
	Ok(Json(result))
}

/// POST /v1/insights/{provider}/refresh-all
///
/// Sweep every connected tenant for the provider.
pub async fn refresh_all(
	State(state): State<AppState>,
	Path(provider): Path<String>,
) -> Result<Json<RefreshAllReport>, ApiError> {
	let provider = parse_provider(&provider)?;
	let report = state
		.insights_service
		.refresh_all(provider)
		.await
		.map_err(insights_error)?;
	Ok(Json(report))
}
