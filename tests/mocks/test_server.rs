//! Test server for integration tests

use std::sync::Arc;

use axum::Router;
use clinsight::mocks::{mock_connected_tenant, MockProviderAdapter};
use clinsight::{ApiKeyAuthenticator, InsightsBuilder, ProviderKind};
use tokio::task::JoinHandle;

use super::fixtures::test_settings;

/// Test server instance backed by mock provider adapters
pub struct TestServer {
	pub base_url: String,
	pub handle: JoinHandle<()>,
}

impl TestServer {
	/// Spawn a server with a mock adapter for `provider` and `tenant-1`
	/// already connected to it.
	pub async fn spawn_connected(
		provider: ProviderKind,
	) -> Result<(Self, Arc<MockProviderAdapter>), Box<dyn std::error::Error>> {
		let adapter = Arc::new(MockProviderAdapter::new(provider));

		let (app, _state) = InsightsBuilder::new()
			.with_settings(test_settings())
			.with_adapter(adapter.clone())
			.with_tenant(mock_connected_tenant("tenant-1", "North Clinic", provider))
			.start()
			.await?;

		let server = Self::spawn_server_with_app(app).await?;
		Ok((server, adapter))
	}

	/// Spawn a server where `tenant-1` exists but has no connections.
	#[allow(dead_code)]
	pub async fn spawn_disconnected(
		provider: ProviderKind,
	) -> Result<(Self, Arc<MockProviderAdapter>), Box<dyn std::error::Error>> {
		let adapter = Arc::new(MockProviderAdapter::new(provider));
		let tenant = clinsight::Tenant::new("tenant-1", "North Clinic")?;

		let (app, _state) = InsightsBuilder::new()
			.with_settings(test_settings())
			.with_adapter(adapter.clone())
			.with_tenant(tenant)
			.start()
			.await?;

		let server = Self::spawn_server_with_app(app).await?;
		Ok((server, adapter))
	}

	/// Spawn a server with a mock adapter for `provider` and an arbitrary
	/// set of seeded tenants.
	#[allow(dead_code)]
	pub async fn spawn_with_tenants(
		provider: ProviderKind,
		tenants: Vec<clinsight::Tenant>,
	) -> Result<(Self, Arc<MockProviderAdapter>), Box<dyn std::error::Error>> {
		let adapter = Arc::new(MockProviderAdapter::new(provider));

		let mut builder = InsightsBuilder::new()
			.with_settings(test_settings())
			.with_adapter(adapter.clone());
		for tenant in tenants {
			builder = builder.with_tenant(tenant);
		}
		let (app, _state) = builder.start().await?;

		let server = Self::spawn_server_with_app(app).await?;
		Ok((server, adapter))
	}

	/// Spawn a server that requires the given admin API key.
	#[allow(dead_code)]
	pub async fn spawn_with_api_key(
		provider: ProviderKind,
		api_key: &str,
	) -> Result<(Self, Arc<MockProviderAdapter>), Box<dyn std::error::Error>> {
		let adapter = Arc::new(MockProviderAdapter::new(provider));

		let (app, _state) = InsightsBuilder::new()
			.with_settings(test_settings())
			.with_adapter(adapter.clone())
			.with_tenant(mock_connected_tenant("tenant-1", "North Clinic", provider))
			.with_authenticator(ApiKeyAuthenticator::with_admin_key(api_key))
			.start()
			.await?;

		let server = Self::spawn_server_with_app(app).await?;
		Ok((server, adapter))
	}

	/// Common server spawning logic
	async fn spawn_server_with_app(app: Router) -> Result<Self, Box<dyn std::error::Error>> {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("bind test port");
		let addr = listener.local_addr().unwrap();
		let base_url = format!("http://{}:{}", addr.ip(), addr.port());

		let handle = tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});

		// Give server time to start
		tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

		Ok(Self { base_url, handle })
	}

	#[allow(dead_code)]
	pub fn abort(self) {
		self.handle.abort();
	}
}
