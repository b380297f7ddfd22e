//! Insights endpoint E2E tests

mod mocks;

use crate::mocks::TestServer;
use chrono::{Duration, Utc};
use clinsight::ProviderKind;
use reqwest::Client;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn default_request_serves_the_rolling_window_live() {
	let (server, _adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	let resp = client
		.get(format!(
			"{}/v1/tenants/tenant-1/insights/invoicing",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());
	let body: serde_json::Value = resp.json().await.unwrap();

	let current = &body["current"];
	assert_eq!(current["source"], "live");
	assert_eq!(current["period"]["days"], 90);
	assert_eq!(current["failedUnits"].as_array().unwrap().len(), 0);
	// 91 days inclusive, one invoice per day from the mock.
	assert_eq!(current["summary"]["total_invoices"], 91.0);
	assert_eq!(
		current["dailyBreakdown"].as_array().unwrap().len(),
		91
	);
	assert!(body.get("previous").is_none());

	server.abort();
}

#[tokio::test]
async fn repeated_request_hits_the_cache() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();
	let url = format!(
		"{}/v1/tenants/tenant-1/insights/invoicing?days=30",
		server.base_url
	);

	let first: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
	assert_eq!(first["current"]["source"], "live");
	let fetches = adapter.fetch_calls.load(Ordering::SeqCst);

	let second: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
	assert_eq!(second["current"]["source"], "cached");
	assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), fetches);
	assert_eq!(second["current"]["summary"], first["current"]["summary"]);

	server.abort();
}

#[tokio::test]
async fn force_refresh_goes_back_to_the_provider() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	let url = format!(
		"{}/v1/tenants/tenant-1/insights/invoicing?days=30",
		server.base_url
	);
	client.get(&url).send().await.unwrap();
	let fetches = adapter.fetch_calls.load(Ordering::SeqCst);

	let body: serde_json::Value = client
		.get(format!("{url}&forceRefresh=true"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(body["current"]["source"], "live");
	assert!(adapter.fetch_calls.load(Ordering::SeqCst) > fetches);

	server.abort();
}

#[tokio::test]
async fn explicit_range_with_compare_returns_both_periods() {
	let (server, _adapter) = TestServer::spawn_connected(ProviderKind::LocationInsights)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	let end = Utc::now().date_naive() - Duration::days(1);
	let start = end - Duration::days(30);
	let resp = client
		.get(format!(
			"{}/v1/tenants/tenant-1/insights/location-insights?start={start}&end={end}&compare=true",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());
	let body: serde_json::Value = resp.json().await.unwrap();

	assert_eq!(body["current"]["period"]["start"], start.to_string());
	let previous = &body["previous"];
	assert_eq!(previous["period"]["days"], 30);
	assert_eq!(
		previous["period"]["end"],
		(start - Duration::days(1)).to_string()
	);
	// Mock reports every impression surface, so views sum four metrics.
	assert_eq!(body["current"]["summary"]["total_views"], 4.0 * 31.0);

	server.abort();
}

#[tokio::test]
async fn malformed_periods_are_rejected() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();
	let base = format!(
		"{}/v1/tenants/tenant-1/insights/invoicing",
		server.base_url
	);

	for query in [
		"?start=2024-01-01",
		"?start=2024-05-01&end=2024-04-01",
		"?days=0",
		"?days=9999",
		"?start=2024-01-01&end=2024-02-01&days=30",
	] {
		let resp = client.get(format!("{base}{query}")).send().await.unwrap();
		assert_eq!(resp.status(), 400, "query {query} should be rejected");
		let body: serde_json::Value = resp.json().await.unwrap();
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}
	assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), 0);

	server.abort();
}

#[tokio::test]
async fn manual_refresh_recomputes_the_default_window() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	let resp = client
		.post(format!(
			"{}/v1/tenants/tenant-1/insights/invoicing/refresh",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());
	let body: serde_json::Value = resp.json().await.unwrap();
	assert_eq!(body["source"], "live");
	assert_eq!(body["period"]["days"], 90);
	assert!(adapter.fetch_calls.load(Ordering::SeqCst) > 0);

	server.abort();
}

#[tokio::test]
async fn revoked_grant_surfaces_reauth_to_the_portal() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	// The provider kills the grant; the next forced refresh discovers it.
	adapter.revoke();
	let resp = client
		.post(format!(
			"{}/v1/tenants/tenant-1/connections/invoicing/refresh",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert_eq!(resp.status(), 401);
	let body: serde_json::Value = resp.json().await.unwrap();
	assert_eq!(body["error"], "AUTH_REVOKED");
	assert_eq!(body["requiresReauth"], true);

	// Insights now fail fast without another provider call.
	let refreshes = adapter.refresh_calls.load(Ordering::SeqCst);
	let resp = client
		.get(format!(
			"{}/v1/tenants/tenant-1/insights/invoicing",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert_eq!(resp.status(), 401);
	assert_eq!(adapter.refresh_calls.load(Ordering::SeqCst), refreshes);

	// Status reflects the needs-reauth state.
	let status: serde_json::Value = client
		.get(format!(
			"{}/v1/tenants/tenant-1/connections/invoicing/status",
			server.base_url
		))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(status["needsReauth"], true);
	assert_eq!(status["state"], "needs_reauth");

	server.abort();
}

#[tokio::test]
async fn api_key_gates_insights_reads() {
	let (server, _adapter) =
		TestServer::spawn_with_api_key(ProviderKind::Invoicing, "test-admin-key")
			.await
			.expect("Failed to start test server");
	let client = Client::new();
	let url = format!(
		"{}/v1/tenants/tenant-1/insights/invoicing?days=7",
		server.base_url
	);

	let resp = client.get(&url).send().await.unwrap();
	assert_eq!(resp.status(), 401);

	let resp = client
		.get(&url)
		.header("x-api-key", "wrong-key")
		.send()
		.await
		.unwrap();
	assert_eq!(resp.status(), 401);

	let resp = client
		.get(&url)
		.header("x-api-key", "test-admin-key")
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());

	// Health stays public.
	let resp = client
		.get(format!("{}/health", server.base_url))
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());

	server.abort();
}
