//! Storage abstraction for tenants and cached aggregates

pub mod traits;

pub use traits::{
	AggregateStore, StorageError, StorageResult, StorageStats, StorageTrait, TenantStore,
};
