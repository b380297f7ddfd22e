//! Scripted provider adapter and fixtures shared by the service tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use clinsight_adapters::AdapterRegistry;
use clinsight_storage::{MemoryStore, Storage};
use clinsight_types::summary::source_metrics;
use clinsight_types::{
	ConnectionCredential, FetchWindow, MetricPoint, ProviderAdapter, ProviderConfig,
	ProviderError, ProviderKind, ProviderResult, RawSeries, SecretString, Tenant, TenantStore,
	TokenGrant, WindowSeries,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::token::TokenService;

/// Adapter whose responses are scripted up front. Refresh and exchange
/// results are popped from queues; fetches succeed with a constant value
/// per metric per day unless a failure was scripted for the window's
/// sequence index.
#[derive(Debug)]
pub struct ScriptedProvider {
	kind: ProviderKind,
	refresh_queue: Mutex<VecDeque<ProviderResult<TokenGrant>>>,
	exchange_queue: Mutex<VecDeque<ProviderResult<TokenGrant>>>,
	fetch_failures: Mutex<HashMap<u32, VecDeque<ProviderError>>>,
	pub refresh_calls: AtomicUsize,
	pub fetch_calls: AtomicUsize,
	pub probe_calls: AtomicUsize,
	/// Value reported for every metric on every day.
	pub point_value: f64,
}

impl ScriptedProvider {
	pub fn new(kind: ProviderKind) -> Self {
		Self {
			kind,
			refresh_queue: Mutex::new(VecDeque::new()),
			exchange_queue: Mutex::new(VecDeque::new()),
			fetch_failures: Mutex::new(HashMap::new()),
			refresh_calls: AtomicUsize::new(0),
			fetch_calls: AtomicUsize::new(0),
			probe_calls: AtomicUsize::new(0),
			point_value: 1.0,
		}
	}

	pub fn push_refresh(&self, result: ProviderResult<TokenGrant>) {
		self.refresh_queue.lock().unwrap().push_back(result);
	}

	pub fn push_exchange(&self, result: ProviderResult<TokenGrant>) {
		self.exchange_queue.lock().unwrap().push_back(result);
	}

	/// Script a failure for the next fetch of the given window sequence.
	/// Multiple calls queue multiple consecutive failures.
	pub fn fail_fetch(&self, sequence: u32, error: ProviderError) {
		self.fetch_failures
			.lock()
			.unwrap()
			.entry(sequence)
			.or_default()
			.push_back(error);
	}
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	fn authorize_url(&self, config: &ProviderConfig, state: &str) -> ProviderResult<String> {
		Ok(format!("{}?state={state}", config.auth_url))
	}

	async fn exchange_code(
		&self,
		_config: &ProviderConfig,
		_code: &str,
		realm_id: Option<&str>,
	) -> ProviderResult<TokenGrant> {
		let result = self
			.exchange_queue
			.lock()
			.unwrap()
			.pop_front()
			.expect("no exchange result scripted");
		result.map(|mut grant| {
			if grant.realm_id.is_none() {
				grant.realm_id = realm_id.map(str::to_string);
			}
			grant
		})
	}

	async fn refresh_token(
		&self,
		_config: &ProviderConfig,
		_refresh_token: &SecretString,
	) -> ProviderResult<TokenGrant> {
		self.refresh_calls.fetch_add(1, Ordering::SeqCst);
		self.refresh_queue
			.lock()
			.unwrap()
			.pop_front()
			.expect("no refresh result scripted")
	}

	async fn discover_resource(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
	) -> ProviderResult<Option<String>> {
		Ok(Some("loc-1".to_string()))
	}

	async fn fetch_window(
		&self,
		_config: &ProviderConfig,
		_access_token: &SecretString,
		_resource_id: Option<&str>,
		window: &FetchWindow,
	) -> ProviderResult<WindowSeries> {
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);

		if let Some(queue) = self.fetch_failures.lock().unwrap().get_mut(&window.sequence) {
			if let Some(error) = queue.pop_front() {
				return Err(error);
			}
		}

		// Both endpoints inclusive, like the real providers.
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
		self.probe_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

pub fn test_config(kind: ProviderKind) -> ProviderConfig {
	ProviderConfig {
		kind,
		client_id: "client-1".to_string(),
		client_secret: SecretString::from("secret-1"),
		auth_url: "https://auth.provider.test/authorize".to_string(),
		token_url: "https://auth.provider.test/token".to_string(),
		api_base_url: "https://api.provider.test".to_string(),
		redirect_uri: "https://portal.test/callback".to_string(),
		scopes: vec!["analytics.read".to_string()],
		timeout_ms: 1_000,
	}
}

/// Tenant `tenant-1` connected to `provider` with tokens `access-0` /
/// `refresh-0` expiring `expires_in_secs` from now.
pub fn connected_tenant(provider: ProviderKind, expires_in_secs: i64) -> Tenant {
	let mut tenant = Tenant::new("tenant-1", "North Clinic").unwrap();
	let mut credential = ConnectionCredential::from_grant(
		TokenGrant {
			access_token: SecretString::from("access-0"),
			refresh_token: Some(SecretString::from("refresh-0")),
			expires_in: expires_in_secs,
			realm_id: None,
		},
		Utc::now(),
	);
	credential.resource_id = Some("resource-1".to_string());
	tenant.set_credential(provider, credential);
	tenant
}

/// Token service wired to an in-memory store seeded with `tenant`, using
/// the scripted adapter for every configured provider.
pub async fn scripted_service(
	adapter: Arc<ScriptedProvider>,
	tenant: Tenant,
) -> (TokenService, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());
	store.add_tenant(tenant).await.unwrap();

	let mut registry = AdapterRegistry::new();
	registry.register(adapter.clone());

	let configs: BTreeMap<ProviderKind, ProviderConfig> = ProviderKind::ALL
		.iter()
		.map(|kind| (*kind, test_config(*kind)))
		.collect();

	let storage: Storage = store.clone();
	let service = TokenService::new(storage, Arc::new(registry), configs, 10);
	(service, store)
}
