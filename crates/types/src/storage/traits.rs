//! Storage traits implemented by concrete backends
//!
//! The engine reads and writes tenants (with their credential slots) and
//! cached aggregate results. Both live behind async traits so the memory
//! backend used today can be swapped for a document store without
//! touching the services.

use crate::insights::StoredAggregate;
use crate::providers::ProviderKind;
use crate::tenants::Tenant;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("entity not found: {id}")]
	NotFound { id: String },

	#[error("storage connection error: {message}")]
	Connection { message: String },

	#[error("serialization error: {message}")]
	Serialization { message: String },

	#[error("storage operation failed: {message}")]
	Operation { message: String },
}

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
	pub tenants: usize,
	pub aggregates: usize,
}

/// CRUD over the tenant directory.
#[async_trait]
pub trait TenantStore: Send + Sync {
	/// Insert a new tenant; fails if the id already exists.
	async fn add_tenant(&self, tenant: Tenant) -> StorageResult<Tenant>;

	async fn get_tenant(&self, tenant_id: &str) -> StorageResult<Option<Tenant>>;

	/// Replace an existing tenant record.
	async fn update_tenant(&self, tenant: Tenant) -> StorageResult<Tenant>;

	/// Returns true when a record was removed.
	async fn remove_tenant(&self, tenant_id: &str) -> StorageResult<bool>;

	async fn list_tenants(&self) -> StorageResult<Vec<Tenant>>;

	async fn count_tenants(&self) -> StorageResult<usize>;
}

/// Cached aggregates keyed by tenant, provider and period signature.
#[async_trait]
pub trait AggregateStore: Send + Sync {
	/// Insert or replace the record under its signature.
	async fn put_aggregate(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		record: StoredAggregate,
	) -> StorageResult<()>;

	async fn get_aggregate(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		signature: &str,
	) -> StorageResult<Option<StoredAggregate>>;

	/// Every stored aggregate for a tenant and provider, newest first.
	async fn list_aggregates(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> StorageResult<Vec<StoredAggregate>>;

	/// Drop all aggregates for a tenant and provider; returns how many
	/// were removed.
	async fn delete_aggregates(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> StorageResult<usize>;

	/// Drop expired records across all tenants; returns how many were
	/// removed.
	async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize>;

	async fn count_aggregates(&self) -> StorageResult<usize>;
}

/// Complete storage backend.
#[async_trait]
pub trait StorageTrait: TenantStore + AggregateStore + Send + Sync + 'static {
	/// Cheap readiness probe used by the health endpoint.
	async fn health_check(&self) -> StorageResult<()>;

	async fn stats(&self) -> StorageResult<StorageStats>;

	/// Start background maintenance (expired-aggregate sweeping).
	async fn start_background_tasks(self: std::sync::Arc<Self>) -> StorageResult<()>;
}
