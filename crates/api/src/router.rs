use axum::{
	middleware::from_fn_with_state,
	routing::{delete, get, post},
	Router,
};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	limit::RequestBodyLimitLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tracing::Level;

use crate::auth::auth_middleware;
use crate::handlers::{
	callback, connect, connection_status, disconnect, get_insights, health, ready, refresh_all,
	refresh_connection, refresh_insights,
};
use crate::security::add_security_headers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
	// Layers prepared first so they're in scope for all paths
	let cors = CorsLayer::permissive();
	let body_limit = RequestBodyLimitLayer::new(1024 * 1024);
	let trace = TraceLayer::new_for_http()
		.make_span_with(|req: &axum::http::Request<_>| {
			let req_id = req
				.headers()
				.get("x-request-id")
				.and_then(|v| v.to_str().ok())
				.unwrap_or("-");
			tracing::info_span!(
				"http_request",
				method = %req.method(),
				uri = %req.uri(),
				req_id
			)
		})
		.on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
		.on_response(
			tower_http::trace::DefaultOnResponse::new()
				.level(Level::INFO)
				.latency_unit(tower_http::LatencyUnit::Millis),
		);
	let req_id = ServiceBuilder::new()
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.layer(PropagateRequestIdLayer::x_request_id());

	let router = Router::new()
		.route("/health", get(health))
		.route("/ready", get(ready))
		.route(
			"/v1/tenants/{tenant_id}/connections/{provider}/connect",
			get(connect),
		)
		.route(
			"/v1/tenants/{tenant_id}/connections/{provider}/status",
			get(connection_status),
		)
		.route(
			"/v1/tenants/{tenant_id}/connections/{provider}/refresh",
			post(refresh_connection),
		)
		.route(
			"/v1/tenants/{tenant_id}/connections/{provider}",
			delete(disconnect),
		)
		.route("/v1/connections/{provider}/callback", get(callback))
		.route(
			"/v1/tenants/{tenant_id}/insights/{provider}",
			get(get_insights),
		)
		.route(
			"/v1/tenants/{tenant_id}/insights/{provider}/refresh",
			post(refresh_insights),
		)
		.route("/v1/insights/{provider}/refresh-all", post(refresh_all));

	let router = router
		.layer(from_fn_with_state(state, auth_middleware))
		.layer(cors)
		.layer(CompressionLayer::new())
		.layer(trace)
		.layer(req_id)
		.layer(body_limit);

	add_security_headers(router)
}
