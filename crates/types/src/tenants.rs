//! Tenant entity: a clinic with one credential slot per provider

use crate::credentials::ConnectionCredential;
use crate::providers::ProviderKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenantValidationError {
	#[error("tenant id must not be empty")]
	EmptyTenantId,

	#[error("tenant name must not be empty")]
	EmptyName,
}

/// A clinic using the portal. Credentials hang off the tenant record and
/// are only ever mutated through the token service.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
	pub tenant_id: String,
	pub name: String,
	#[serde(skip_serializing)]
	pub credentials: BTreeMap<ProviderKind, ConnectionCredential>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Tenant {
	pub fn new(tenant_id: &str, name: &str) -> Result<Self, TenantValidationError> {
		if tenant_id.trim().is_empty() {
			return Err(TenantValidationError::EmptyTenantId);
		}
		if name.trim().is_empty() {
			return Err(TenantValidationError::EmptyName);
		}
		let now = Utc::now();
		Ok(Self {
			tenant_id: tenant_id.to_string(),
			name: name.to_string(),
			credentials: BTreeMap::new(),
			created_at: now,
			updated_at: now,
		})
	}

	pub fn credential(&self, provider: ProviderKind) -> Option<&ConnectionCredential> {
		self.credentials.get(&provider)
	}

	/// Replace the credential slot for a provider, touching `updated_at`.
	pub fn set_credential(&mut self, provider: ProviderKind, credential: ConnectionCredential) {
		self.credentials.insert(provider, credential);
		self.updated_at = Utc::now();
	}

	pub fn clear_credential(&mut self, provider: ProviderKind) {
		self.credentials.remove(&provider);
		self.updated_at = Utc::now();
	}

	pub fn is_connected(&self, provider: ProviderKind) -> bool {
		self.credential(provider).map(|c| c.connected).unwrap_or(false)
	}
}
