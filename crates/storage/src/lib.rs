//! Clinsight Storage
//!
//! Storage implementations for the analytics synchronization engine. The
//! in-memory backend is the default; the traits it implements live in
//! `clinsight-types` so other backends can slot in.

pub mod memory_store;

pub use clinsight_types::storage::{
	AggregateStore, StorageError, StorageResult, StorageStats, StorageTrait, TenantStore,
};
pub use memory_store::MemoryStore;

use std::sync::Arc;

/// Shared handle to the storage backend.
pub type Storage = Arc<dyn StorageTrait>;
