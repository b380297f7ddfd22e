//! In-memory storage implementation using DashMap with TTL support

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinsight_types::storage::{
	AggregateStore, StorageError, StorageResult, StorageStats, StorageTrait, TenantStore,
};
use clinsight_types::{ProviderKind, StoredAggregate, Tenant};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::debug;

type AggregateKey = (String, ProviderKind, String);

/// In-memory store for tenants and cached aggregates.
#[derive(Clone)]
pub struct MemoryStore {
	tenants: Arc<DashMap<String, Tenant>>,
	aggregates: Arc<DashMap<AggregateKey, StoredAggregate>>,
	ttl_enabled: bool,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		Self {
			tenants: Arc::new(DashMap::new()),
			aggregates: Arc::new(DashMap::new()),
			ttl_enabled: true,
		}
	}

	/// TTL sweeping can be disabled for tests that control time manually.
	pub fn with_ttl_enabled(ttl_enabled: bool) -> Self {
		Self {
			ttl_enabled,
			..Self::new()
		}
	}

	/// Start the sweep task that drops expired aggregates once a minute.
	pub fn start_ttl_cleanup(&self) -> tokio::task::JoinHandle<()> {
		if !self.ttl_enabled {
			return tokio::spawn(async {});
		}

		let aggregates = Arc::clone(&self.aggregates);
		tokio::spawn(async move {
			let mut cleanup_interval = interval(Duration::from_secs(60));

			loop {
				cleanup_interval.tick().await;

				let now = Utc::now();
				let expired: Vec<AggregateKey> = aggregates
					.iter()
					.filter(|entry| entry.value().is_expired(now))
					.map(|entry| entry.key().clone())
					.collect();

				if !expired.is_empty() {
					debug!("Cleaning up {} expired aggregates", expired.len());
					for key in expired {
						aggregates.remove(&key);
					}
				}
			}
		})
	}
}

#[async_trait]
impl TenantStore for MemoryStore {
	async fn add_tenant(&self, tenant: Tenant) -> StorageResult<Tenant> {
		if self.tenants.contains_key(&tenant.tenant_id) {
			return Err(StorageError::Operation {
				message: format!("tenant '{}' already exists", tenant.tenant_id),
			});
		}
		self.tenants.insert(tenant.tenant_id.clone(), tenant.clone());
		Ok(tenant)
	}

	async fn get_tenant(&self, tenant_id: &str) -> StorageResult<Option<Tenant>> {
		Ok(self.tenants.get(tenant_id).map(|entry| entry.clone()))
	}

	async fn update_tenant(&self, tenant: Tenant) -> StorageResult<Tenant> {
		if !self.tenants.contains_key(&tenant.tenant_id) {
			return Err(StorageError::NotFound {
				id: tenant.tenant_id,
			});
		}
		self.tenants.insert(tenant.tenant_id.clone(), tenant.clone());
		Ok(tenant)
	}

	async fn remove_tenant(&self, tenant_id: &str) -> StorageResult<bool> {
		Ok(self.tenants.remove(tenant_id).is_some())
	}

	async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
		Ok(self.tenants.iter().map(|entry| entry.clone()).collect())
	}

	async fn count_tenants(&self) -> StorageResult<usize> {
		Ok(self.tenants.len())
	}
}

#[async_trait]
impl AggregateStore for MemoryStore {
	async fn put_aggregate(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		record: StoredAggregate,
	) -> StorageResult<()> {
		let key = (tenant_id.to_string(), provider, record.signature.clone());
		self.aggregates.insert(key, record);
		Ok(())
	}

	async fn get_aggregate(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		signature: &str,
	) -> StorageResult<Option<StoredAggregate>> {
		let key = (tenant_id.to_string(), provider, signature.to_string());
		Ok(self.aggregates.get(&key).map(|entry| entry.clone()))
	}

	async fn list_aggregates(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> StorageResult<Vec<StoredAggregate>> {
		let mut records: Vec<StoredAggregate> = self
			.aggregates
			.iter()
			.filter(|entry| entry.key().0 == tenant_id && entry.key().1 == provider)
			.map(|entry| entry.value().clone())
			.collect();
		records.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
		Ok(records)
	}

	async fn delete_aggregates(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> StorageResult<usize> {
		let keys: Vec<AggregateKey> = self
			.aggregates
			.iter()
			.filter(|entry| entry.key().0 == tenant_id && entry.key().1 == provider)
			.map(|entry| entry.key().clone())
			.collect();
		let removed = keys.len();
		for key in keys {
			self.aggregates.remove(&key);
		}
		Ok(removed)
	}

	async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize> {
		let keys: Vec<AggregateKey> = self
			.aggregates
			.iter()
			.filter(|entry| entry.value().is_expired(now))
			.map(|entry| entry.key().clone())
			.collect();
		let removed = keys.len();
		for key in keys {
			self.aggregates.remove(&key);
		}
		Ok(removed)
	}

	async fn count_aggregates(&self) -> StorageResult<usize> {
		Ok(self.aggregates.len())
	}
}

#[async_trait]
impl StorageTrait for MemoryStore {
	async fn health_check(&self) -> StorageResult<()> {
		Ok(())
	}

	async fn stats(&self) -> StorageResult<StorageStats> {
		Ok(StorageStats {
			tenants: self.tenants.len(),
			aggregates: self.aggregates.len(),
		})
	}

	async fn start_background_tasks(self: Arc<Self>) -> StorageResult<()> {
		self.start_ttl_cleanup();
		Ok(())
	}
}
