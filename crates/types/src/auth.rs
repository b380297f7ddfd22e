//! Authentication seam for the API layer
//!
//! The engine does not manage portal sessions; it only needs to know
//! whether a request is allowed to manage connections and read insights.
//! The middleware supplies an [`AuthRequest`], an [`Authenticator`]
//! decides.

use crate::models::SecretString;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
	#[error("missing credentials")]
	MissingCredentials,

	#[error("invalid credentials")]
	InvalidCredentials,

	#[error("insufficient permissions")]
	InsufficientPermissions,
}

/// What an authenticated caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
	ReadInsights,
	ManageConnections,
	Admin,
}

/// Authenticated caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
	pub client_id: String,
	pub permissions: Vec<Permission>,
}

impl AuthContext {
	pub fn new(client_id: &str) -> Self {
		Self {
			client_id: client_id.to_string(),
			permissions: Vec::new(),
		}
	}

	pub fn with_permission(mut self, permission: Permission) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn admin(client_id: &str) -> Self {
		Self::new(client_id).with_permission(Permission::Admin)
	}

	/// Admin implies every other permission.
	pub fn allows(&self, permission: Permission) -> bool {
		self.permissions.contains(&Permission::Admin) || self.permissions.contains(&permission)
	}
}

/// Credential material extracted from an incoming request.
#[derive(Debug, Clone)]
pub struct AuthRequest {
	pub api_key: Option<String>,
	pub path: String,
	pub method: String,
}

/// Decides whether a request is authenticated and what it may do.
#[async_trait]
pub trait Authenticator: Send + Sync {
	async fn authenticate(&self, request: &AuthRequest) -> AuthResult<AuthContext>;

	fn name(&self) -> &str;
}

/// Allows everything; used in tests and single-operator deployments where
/// the reverse proxy already gates access.
#[derive(Debug, Default)]
pub struct NoAuthenticator;

#[async_trait]
impl Authenticator for NoAuthenticator {
	async fn authenticate(&self, _request: &AuthRequest) -> AuthResult<AuthContext> {
		Ok(AuthContext::admin("anonymous"))
	}

	fn name(&self) -> &str {
		"NoAuthenticator"
	}
}

/// Static API-key authenticator. Keys are registered at startup and
/// compared in constant time.
#[derive(Debug, Default)]
pub struct ApiKeyAuthenticator {
	keys: HashMap<String, (SecretString, AuthContext)>,
}

impl ApiKeyAuthenticator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_key(mut self, api_key: &str, context: AuthContext) -> Self {
		self.keys.insert(
			context.client_id.clone(),
			(SecretString::from(api_key), context),
		);
		self
	}

	pub fn with_admin_key(api_key: &str) -> Self {
		Self::new().with_key(api_key, AuthContext::admin("admin"))
	}
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
	async fn authenticate(&self, request: &AuthRequest) -> AuthResult<AuthContext> {
		let presented = request
			.api_key
			.as_deref()
			.ok_or(AuthError::MissingCredentials)?;
		let presented = SecretString::from(presented);

		for (key, context) in self.keys.values() {
			if *key == presented {
				return Ok(context.clone());
			}
		}
		Err(AuthError::InvalidCredentials)
	}

	fn name(&self) -> &str {
		"ApiKeyAuthenticator"
	}
}
