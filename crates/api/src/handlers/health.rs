use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
	"OK"
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
	pub status: String,
	pub storage_healthy: bool,
	pub tenants: usize,
	pub aggregates: usize,
}

/// GET /ready - Readiness probe with storage checks
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
	let storage_healthy = state.storage.health_check().await.is_ok();
	let stats = state.storage.stats().await.ok();

	let status = if storage_healthy { "ready" } else { "degraded" };
	let body = ReadinessResponse {
		status: status.to_string(),
		storage_healthy,
		tenants: stats.as_ref().map(|s| s.tenants).unwrap_or(0),
		aggregates: stats.as_ref().map(|s| s.aggregates).unwrap_or(0),
	};
	let code = if storage_healthy {
		StatusCode::OK
	} else {
		StatusCode::SERVICE_UNAVAILABLE
	};
	(code, Json(body))
}
