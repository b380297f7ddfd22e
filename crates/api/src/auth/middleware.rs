//! Authentication middleware using the auth traits

use axum::{
	extract::{Request, State},
	http::StatusCode,
	middleware::Next,
	response::Response,
};
use clinsight_types::{AuthRequest, Permission};
use tracing::{debug, warn};

use crate::handlers::common::{api_error, ApiError};
use crate::state::AppState;

/// Paths served without credentials: probes, and the OAuth redirect
/// target the providers call directly.
const PUBLIC_PREFIXES: [&str; 3] = ["/health", "/ready", "/v1/connections/"];

/// Authentication middleware function
pub async fn auth_middleware(
	State(state): State<AppState>,
	request: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let path = request.uri().path().to_string();
	let method = request.method().to_string();

	if PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
		debug!(path, "public path, skipping auth");
		return Ok(next.run(request).await);
	}

	let api_key = request
		.headers()
		.get("x-api-key")
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);

	let auth_request = AuthRequest {
		api_key,
		path: path.clone(),
		method: method.clone(),
	};

	let context = state
		.authenticator
		.authenticate(&auth_request)
		.await
		.map_err(|e| {
			warn!(path, error = %e, "authentication failed");
			api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
		})?;

	let required = required_permission(&path, &method);
	if !context.allows(required) {
		warn!(
			path,
			client_id = %context.client_id,
			"authorization failed"
		);
		return Err(api_error(
			StatusCode::FORBIDDEN,
			"FORBIDDEN",
			"insufficient permissions".to_string(),
		));
	}

	let mut request = request;
	request.extensions_mut().insert(context);
	Ok(next.run(request).await)
}

/// Reading aggregates needs the insights permission; everything else on
/// the API mutates connections or caches.
fn required_permission(path: &str, method: &str) -> Permission {
	if method == "GET" && path.contains("/insights/") {
		Permission::ReadInsights
	} else {
		Permission::ManageConnections
	}
}
