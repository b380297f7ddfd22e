//! Refresh-all sweep E2E tests

mod mocks;

use crate::mocks::TestServer;
use clinsight::mocks::mock_connected_tenant;
use clinsight::{ProviderKind, Tenant};
use reqwest::Client;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn refresh_all_sweeps_connected_tenants_and_skips_the_rest() {
	let (server, adapter) = TestServer::spawn_with_tenants(
		ProviderKind::Invoicing,
		vec![
			mock_connected_tenant("tenant-1", "North Clinic", ProviderKind::Invoicing),
			mock_connected_tenant("tenant-2", "South Clinic", ProviderKind::Invoicing),
			Tenant::new("tenant-3", "East Clinic").unwrap(),
		],
	)
	.await
	.expect("Failed to start test server");
	let client = Client::new();

	let resp = client
		.post(format!(
			"{}/v1/insights/invoicing/refresh-all",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert!(resp.status().is_success());
	let body: serde_json::Value = resp.json().await.unwrap();

	assert_eq!(body["provider"], "invoicing");
	assert_eq!(
		body["refreshed"],
		serde_json::json!(["tenant-1", "tenant-2"])
	);
	assert_eq!(body["skipped"], serde_json::json!(["tenant-3"]));
	assert_eq!(body["failed"].as_array().unwrap().len(), 0);
	assert!(adapter.fetch_calls.load(Ordering::SeqCst) > 0);

	server.abort();
}

#[tokio::test]
async fn refresh_all_leaves_warm_caches_behind() {
	let (server, adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	client
		.post(format!(
			"{}/v1/insights/invoicing/refresh-all",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	let fetches = adapter.fetch_calls.load(Ordering::SeqCst);

	// The sweep recomputed the default rolling window, so the next read
	// for that window is a cache hit.
	let body: serde_json::Value = client
		.get(format!(
			"{}/v1/tenants/tenant-1/insights/invoicing",
			server.base_url
		))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(body["current"]["source"], "cached");
	assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), fetches);

	server.abort();
}

#[tokio::test]
async fn refresh_all_for_an_unknown_provider_is_rejected() {
	let (server, _adapter) = TestServer::spawn_connected(ProviderKind::Invoicing)
		.await
		.expect("Failed to start test server");
	let client = Client::new();

	let resp = client
		.post(format!(
			"{}/v1/insights/payroll/refresh-all",
			server.base_url
		))
		.send()
		.await
		.unwrap();
	assert_eq!(resp.status(), 400);
	let body: serde_json::Value = resp.json().await.unwrap();
	assert_eq!(body["error"], "VALIDATION_ERROR");

	server.abort();
}
