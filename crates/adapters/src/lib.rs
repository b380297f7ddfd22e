//! Clinsight Adapters
//!
//! Provider-specific adapters for the analytics synchronization engine.

pub mod client;
pub mod invoicing;
pub mod location_insights;
pub mod oauth;

pub use clinsight_types::{ProviderAdapter, ProviderError, ProviderResult};
pub use invoicing::InvoicingAdapter;
pub use location_insights::LocationInsightsAdapter;

use clinsight_types::ProviderKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of provider adapters, keyed by the provider they talk to.
pub struct AdapterRegistry {
	adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self {
			adapters: HashMap::new(),
		}
	}

	/// Registry with both built-in adapters.
	pub fn with_defaults() -> ProviderResult<Self> {
		let mut registry = Self::new();
		registry.register(Arc::new(LocationInsightsAdapter::new()?));
		registry.register(Arc::new(InvoicingAdapter::new()?));
		Ok(registry)
	}

	/// Register an adapter under its own provider kind, replacing any
	/// previous registration for that provider.
	pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
		self.adapters.insert(adapter.kind(), adapter);
	}

	pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
		self.adapters.get(&kind).cloned()
	}

	pub fn kinds(&self) -> Vec<ProviderKind> {
		self.adapters.keys().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}
}

impl Default for AdapterRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_cover_every_provider_kind() {
		let registry = AdapterRegistry::with_defaults().unwrap();
		for kind in ProviderKind::ALL {
			let adapter = registry.get(kind).expect("adapter registered");
			assert_eq!(adapter.kind(), kind);
		}
		assert_eq!(registry.len(), ProviderKind::ALL.len());
	}

	#[test]
	fn registering_twice_replaces() {
		let mut registry = AdapterRegistry::new();
		registry.register(Arc::new(InvoicingAdapter::new().unwrap()));
		registry.register(Arc::new(InvoicingAdapter::new().unwrap()));
		assert_eq!(registry.len(), 1);
	}
}
