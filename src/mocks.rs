//! Mock provider adapters for examples and testing
//!
//! This module provides a simple, working mock adapter that can be used
//! in examples and tests without talking to any real provider.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use clinsight_types::chrono::{Duration, Utc};
use clinsight_types::summary::source_metrics;
use clinsight_types::{
	ConnectionCredential, FetchWindow, MetricPoint, ProviderAdapter, ProviderConfig,
	ProviderError, ProviderKind, ProviderResult, RawSeries, SecretString, Tenant, TokenGrant,
	WindowSeries,
};

/// Simple mock adapter for examples and testing.
///
/// Every metric reports `point_value` for every day of a requested
/// window. Token grants are numbered so tests can observe rotation, and
/// [`revoke`](MockProviderAdapter::revoke) makes every later refresh fail
/// the way a provider rejects a dead grant.
#[derive(Debug)]
pub struct MockProviderAdapter {
	kind: ProviderKind,
	pub point_value: f64,
	pub exchange_calls: AtomicUsize,
	pub refresh_calls: AtomicUsize,
	pub fetch_calls: AtomicUsize,
	grant_counter: AtomicUsize,
	revoked: AtomicBool,
}

impl MockProviderAdapter {
	pub fn new(kind: ProviderKind) -> Self {
		Self {
			kind,
			point_value: 1.0,
			exchange_calls: AtomicUsize::new(0),
			refresh_calls: AtomicUsize::new(0),
			fetch_calls: AtomicUsize::new(0),
			grant_counter: AtomicUsize::new(0),
			revoked: AtomicBool::new(false),
		}
	}

	/// Make every refresh from now on fail with `invalid_grant`.
	pub fn revoke(&self) {
		self.revoked.store(true, Ordering::SeqCst);
	}

	fn next_grant(&self) -> TokenGrant {
		let n = self.grant_counter.fetch_add(1, Ordering::SeqCst);
		TokenGrant {
			access_token: SecretString::from(format!("mock-access-{n}").as_str()),
			refresh_token: Some(SecretString::from("mock-refresh")),
			expires_in: 3600,
			realm_id: None,
		}
	}
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	fn authorize_url(&self, config: &ProviderConfig, state: &str) -> ProviderResult<String> {
		Ok(format!(
			"{}?client_id={}&state={state}",
			config.auth_url, config.client_id
		))
	}

	async fn exchange_code(
		&self,
		_config: &ProviderConfig,
		_code: &str,
		realm_id: Option<&str>,
	) -> ProviderResult<TokenGrant> {
		self.exchange_calls.fetch_add(1, Ordering::SeqCst);
		let mut grant = self.next_grant();
		grant.realm_id = realm_id.map(str::to_string);
		Ok(grant)
	}

	async fn refresh_token(
		&self,
		_config: &ProviderConfig,
		_refresh_token: &SecretString,
	) -> ProviderResult<TokenGrant> {
		self.refresh_calls.fetch_add(1, Ordering::SeqCst);
		if self.revoked.load(Ordering::SeqCst) {
			return Err(ProviderError::OAuth {
				code: "invalid_grant".to_string(),
				description: "Token revoked".to_string(),
			});
		}
		Ok(self.next_grant())
	}

	async fn discover_resource(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
	) -> ProviderResult<Option<String>> {
		Ok(Some("mock-location".to_string()))
	}

	async fn fetch_window(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
		_resource_id: Option<&str>,
		window: &FetchWindow,
	) -> ProviderResult<WindowSeries> {
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);

		let series = source_metrics(self.kind)
			.into_iter()
			.map(|metric| {
				let mut points = Vec::new();
				let mut date = window.start;
				while date <= window.end {
					points.push(MetricPoint {
						date,
						value: self.point_value,
					});
					date += Duration::days(1);
				}
				RawSeries {
					metric: metric.to_string(),
					points,
				}
			})
			.collect();

		Ok(WindowSeries {
			sequence: window.sequence,
			series,
		})
	}

	async fn probe(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
		_resource_id: Option<&str>,
	) -> ProviderResult<()> {
		Ok(())
	}
}

/// A tenant connected to `provider` with mock tokens expiring an hour
/// from now.
pub fn mock_connected_tenant(tenant_id: &str, name: &str, provider: ProviderKind) -> Tenant {
	let mut tenant = Tenant::new(tenant_id, name).expect("valid tenant fixture");
	let mut credential = ConnectionCredential::from_grant(
		TokenGrant {
			access_token: SecretString::from("mock-access-seed"),
			refresh_token: Some(SecretString::from("mock-refresh")),
			expires_in: 3600,
			realm_id: None,
		},
		Utc::now(),
	);
	credential.resource_id = Some("mock-location".to_string());
	tenant.set_credential(provider, credential);
	tenant
}
