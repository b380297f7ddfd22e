//! Clinsight Library
//!
//! An OAuth-backed synchronization engine that keeps external analytics
//! (location profile metrics, invoicing totals) flowing into a clinic
//! portal: token lifecycle, windowed fetching, merging, summary buckets
//! and a freshness-gated cache, behind an Axum API.

// Core domain types - the most commonly used types
pub use clinsight_types::{
	// External dependencies for convenience
	chrono,
	serde_json,
	AggregatePeriod,
	AggregateResult,
	AggregateSource,
	ApiKeyAuthenticator,
	AuthContext,
	AuthRequest,
	// Auth traits
	Authenticator,
	ConnectionCredential,
	ConnectionState,
	ConnectionStatus,
	DailyEntry,
	FetchWindow,
	// Error types
	InsightsError,
	InsightsQuery,
	InsightsRequest,
	InsightsResponse,
	NoAuthenticator,
	Permission,
	ProviderAdapter,
	ProviderConfig,
	ProviderError,
	ProviderKind,
	SecretString,
	// Primary domain entities
	Tenant,
	TokenError,
	TokenGrant,
};

// Service layer
pub use clinsight_service::{
	BatchFetcher, ConnectPrompt, FreshnessGate, InsightsService, RefreshAllReport, TokenService,
};

// Storage layer
pub use clinsight_storage::{MemoryStore, Storage};

// API layer
pub use clinsight_api::{create_router, AppState};

// Adapters
pub use clinsight_adapters::AdapterRegistry;

// Config
pub use clinsight_config::{load_config, log_service_info, log_startup_complete, Settings};

pub mod mocks;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

// Re-export external dependencies for examples
pub use async_trait;
pub use reqwest;

/// Builder pattern for configuring the engine
pub struct InsightsBuilder {
	settings: Option<Settings>,
	storage: Storage,
	authenticator: Arc<dyn Authenticator>,
	adapter_registry: Option<AdapterRegistry>,
	tenants: Vec<Tenant>,
}

impl Default for InsightsBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl InsightsBuilder {
	/// Create a new builder with default memory storage
	pub fn new() -> Self {
		Self::with_storage(Arc::new(MemoryStore::new()))
	}

	/// Create a new builder with the provided storage backend
	pub fn with_storage(storage: Storage) -> Self {
		Self {
			settings: None,
			storage,
			authenticator: Arc::new(NoAuthenticator),
			adapter_registry: None,
			tenants: Vec::new(),
		}
	}

	/// Set custom settings
	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Get the current settings
	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Set custom authenticator
	pub fn with_authenticator<A>(self, authenticator: A) -> Self
	where
		A: Authenticator + 'static,
	{
		Self {
			authenticator: Arc::new(authenticator),
			..self
		}
	}

	/// Register a custom provider adapter under its own provider kind.
	pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
		let mut registry = match self.adapter_registry.take() {
			Some(registry) => registry,
			None => AdapterRegistry::new(),
		};
		registry.register(adapter);
		self.adapter_registry = Some(registry);
		self
	}

	/// Seed a tenant into storage at startup
	pub fn with_tenant(mut self, tenant: Tenant) -> Self {
		self.tenants.push(tenant);
		self
	}

	/// Initialize tracing with configuration-based settings
	fn init_tracing_from_settings(
		&self,
		settings: &Settings,
	) -> Result<(), Box<dyn std::error::Error>> {
		use clinsight_config::LogFormat;

		// Create env filter using config level or environment variable
		let log_level = &settings.logging.level;
		let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

		match settings.logging.format {
			LogFormat::Json => {
				tracing_subscriber::fmt()
					.json()
					.with_env_filter(env_filter)
					.init();
			},
			LogFormat::Pretty => {
				tracing_subscriber::fmt()
					.pretty()
					.with_env_filter(env_filter)
					.init();
			},
			LogFormat::Compact => {
				tracing_subscriber::fmt()
					.compact()
					.with_env_filter(env_filter)
					.init();
			},
		}

		info!(
			"Logging configuration applied: level={}, format={:?}",
			settings.logging.level, settings.logging.format
		);

		Ok(())
	}

	/// Seed tenants collected through `with_tenant()` into storage.
	async fn seed_tenants(&self) -> Result<(), String> {
		let mut errors = Vec::new();
		for tenant in &self.tenants {
			if let Err(e) = self.storage.add_tenant(tenant.clone()).await {
				errors.push(format!("Failed to add tenant '{}': {}", tenant.tenant_id, e));
			}
		}
		if !errors.is_empty() {
			return Err(format!("Tenant seeding errors:\n{}", errors.join("\n")));
		}
		Ok(())
	}

	/// Start the engine and return the configured router with state
	pub async fn start(self) -> Result<(axum::Router, AppState), Box<dyn std::error::Error>> {
		let settings = self.settings.clone().unwrap_or_default();
		settings.validate()?;

		self.seed_tenants().await?;

		let provider_configs = settings.provider_configs()?;
		info!(
			"Configured providers: {}",
			provider_configs
				.keys()
				.map(|k| k.as_str())
				.collect::<Vec<_>>()
				.join(", ")
		);

		// Use custom registry or create with defaults
		let adapter_registry = Arc::new(match self.adapter_registry {
			Some(registry) => registry,
			None => AdapterRegistry::with_defaults()?,
		});

		let token_service = Arc::new(TokenService::new(
			self.storage.clone(),
			adapter_registry,
			provider_configs,
			settings.insights.token_refresh_buffer_minutes,
		));
		let insights_service = Arc::new(InsightsService::new(
			self.storage.clone(),
			token_service.clone(),
			settings.insights.clone(),
		));

		let app_state = AppState {
			insights_service,
			token_service,
			storage: self.storage,
			authenticator: self.authenticator,
		};

		let router = create_router(app_state.clone()).with_state(app_state.clone());

		Ok((router, app_state))
	}

	/// Start the complete server with all defaults and setup
	/// This method handles everything needed to run the server, including:
	/// - Loading .env file
	/// - Loading configuration with defaults
	/// - Initializing tracing
	/// - Starting storage maintenance
	/// - Binding and serving the application
	pub async fn start_server(mut self) -> Result<(), Box<dyn std::error::Error>> {
		// Load .env file if it exists
		dotenvy::dotenv().ok();

		// Use provided settings or load from config with defaults
		let using_provided_settings = self.settings.is_some();
		let settings = match self.settings.take() {
			Some(settings) => settings,
			None => load_config().unwrap_or_default(),
		};

		self.init_tracing_from_settings(&settings)?;

		// Log comprehensive service startup information
		log_service_info(&settings);

		info!(
			"Using configuration: loaded from {}",
			if using_provided_settings {
				"provided settings"
			} else {
				"config file or defaults"
			}
		);

		// Parse bind address
		let bind_addr = settings.bind_address();
		let addr: SocketAddr = bind_addr
			.parse()
			.map_err(|e| format!("Invalid bind address '{}': {}", bind_addr, e))?;

		self.settings = Some(settings);
		let storage = self.storage.clone();
		let (app, _) = self.start().await?;

		// Expired-aggregate sweeping runs inside the storage backend.
		storage.start_background_tasks().await?;

		let listener = tokio::net::TcpListener::bind(addr).await?;

		log_startup_complete(&bind_addr);
		info!("API endpoints available:");
		info!("  GET    /health");
		info!("  GET    /ready");
		info!("  GET    /v1/tenants/{{tenant_id}}/connections/{{provider}}/connect");
		info!("  GET    /v1/connections/{{provider}}/callback");
		info!("  GET    /v1/tenants/{{tenant_id}}/connections/{{provider}}/status");
		info!("  POST   /v1/tenants/{{tenant_id}}/connections/{{provider}}/refresh");
		info!("  DELETE /v1/tenants/{{tenant_id}}/connections/{{provider}}");
		info!("  GET    /v1/tenants/{{tenant_id}}/insights/{{provider}}");
		info!("  POST   /v1/tenants/{{tenant_id}}/insights/{{provider}}/refresh");
		info!("  POST   /v1/insights/{{provider}}/refresh-all");

		axum::serve(listener, app).await?;

		Ok(())
	}
}
