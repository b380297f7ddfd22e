//! Response headers for the insights API
//!
//! The API serves JSON to the portal backend, never HTML to a browser,
//! so the policy is locked down: nothing is embeddable, responses are
//! not cacheable (aggregates and token expiries are tenant data; the
//! freshness cache is server-side), and referrers never leak the OAuth
//! callback's `code` and `state` query parameters.

use axum::{
	http::header::{HeaderName, HeaderValue},
	Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

const RESPONSE_HEADERS: &[(&str, &str)] = &[
	("strict-transport-security", "max-age=31536000; includeSubDomains"),
	("x-content-type-options", "nosniff"),
	("x-frame-options", "DENY"),
	("referrer-policy", "no-referrer"),
	("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
	("cache-control", "no-store"),
];

/// Apply the response header policy to every route.
pub fn add_security_headers<S>(mut router: Router<S>) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	for &(name, value) in RESPONSE_HEADERS {
		router = router.layer(SetResponseHeaderLayer::if_not_present(
			HeaderName::from_static(name),
			HeaderValue::from_static(value),
		));
	}
	router
}
