//! Configuration settings structures

use crate::configurable_value::{ConfigurableValue, ConfigurableValueError};
use clinsight_types::{ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub server: ServerSettings,
	pub providers: ProvidersSettings,
	pub insights: InsightsSettings,
	pub environment: EnvironmentSettings,
	pub logging: LoggingSettings,
	pub security: SecuritySettings,
}

/// Server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 3000,
		}
	}
}

/// One section per external provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersSettings {
	pub location_insights: ProviderSettings,
	pub invoicing: ProviderSettings,
}

/// OAuth and endpoint configuration for one provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
	pub enabled: bool,
	pub client_id: String,
	/// Example configurations:
	/// - Environment variable: `{"type": "env", "value": "INVOICING_CLIENT_SECRET"}`
	/// - Plain value: `{"type": "plain", "value": "dev-only-secret"}`
	pub client_secret: ConfigurableValue,
	pub auth_url: String,
	pub token_url: String,
	pub api_base_url: String,
	pub redirect_uri: String,
	pub scopes: Vec<String>,
	pub timeout_ms: u64,
}

impl Default for ProviderSettings {
	fn default() -> Self {
		Self {
			enabled: false,
			client_id: String::new(),
			client_secret: ConfigurableValue::from_env("PROVIDER_CLIENT_SECRET"),
			auth_url: String::new(),
			token_url: String::new(),
			api_base_url: String::new(),
			redirect_uri: String::new(),
			scopes: Vec::new(),
			timeout_ms: 10_000,
		}
	}
}

impl ProviderSettings {
	fn to_provider_config(
		&self,
		kind: ProviderKind,
	) -> Result<ProviderConfig, ConfigurableValueError> {
		Ok(ProviderConfig {
			kind,
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.resolve_secret()?,
			auth_url: self.auth_url.clone(),
			token_url: self.token_url.clone(),
			api_base_url: self.api_base_url.clone(),
			redirect_uri: self.redirect_uri.clone(),
			scopes: self.scopes.clone(),
			timeout_ms: self.timeout_ms,
		})
	}
}

/// Pipeline tuning.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct InsightsSettings {
	/// Widest window a single provider request may cover.
	pub max_window_days: u32,
	/// Ranges at or under this length go out as one request even when the
	/// length exceeds `max_window_days`.
	pub single_request_threshold_days: u32,
	/// Concurrent window fetches within one tenant's request.
	pub tenant_concurrency: usize,
	/// Concurrent tenants during a refresh-all sweep.
	pub refresh_all_concurrency: usize,
	/// Pause between sequential fetches for the same tenant.
	pub inter_batch_delay_ms: u64,
	/// Retries per window for transient failures.
	pub retry_max_attempts: u32,
	/// First retry delay; doubles per attempt.
	pub retry_base_delay_ms: u64,
	/// Refresh the access token this many minutes before expiry.
	pub token_refresh_buffer_minutes: i64,
	/// TTL for explicit start/end periods.
	pub cache_ttl_range_hours: i64,
	/// TTL for rolling trailing windows.
	pub cache_ttl_rolling_hours: i64,
	/// Rolling window used when a request names no period.
	pub rolling_days_default: u32,
	/// Longest explicit range a caller may request.
	pub max_range_days: i64,
}

impl Default for InsightsSettings {
	fn default() -> Self {
		Self {
			max_window_days: 45,
			single_request_threshold_days: 60,
			tenant_concurrency: 2,
			refresh_all_concurrency: 3,
			inter_batch_delay_ms: 500,
			retry_max_attempts: 2,
			retry_base_delay_ms: 250,
			token_refresh_buffer_minutes: 10,
			cache_ttl_range_hours: 12,
			cache_ttl_rolling_hours: 24,
			rolling_days_default: 90,
			max_range_days: 365,
		}
	}
}

/// Environment-specific settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EnvironmentSettings {
	pub profile: EnvironmentProfile,
	pub debug: bool,
}

impl Default for EnvironmentSettings {
	fn default() -> Self {
		Self {
			profile: EnvironmentProfile::Development,
			debug: true,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentProfile {
	Development,
	Staging,
	Production,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

/// Security configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SecuritySettings {
	/// Admin API key; requests must present it when set.
	pub api_key: Option<ConfigurableValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
	#[error("provider {provider} is enabled but {field} is empty")]
	MissingProviderField {
		provider: ProviderKind,
		field: &'static str,
	},

	#[error("token refresh buffer must be between 5 and 30 minutes, got {minutes}")]
	RefreshBufferOutOfRange { minutes: i64 },

	#[error("{field} must be at least 1")]
	ZeroNotAllowed { field: &'static str },

	#[error(transparent)]
	SecretResolution(#[from] ConfigurableValueError),
}

impl Settings {
	/// Get server bind address
	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.server.host, self.server.port)
	}

	pub fn is_production(&self) -> bool {
		self.environment.profile == EnvironmentProfile::Production
	}

	pub fn provider_settings(&self, kind: ProviderKind) -> &ProviderSettings {
		match kind {
			ProviderKind::LocationInsights => &self.providers.location_insights,
			ProviderKind::Invoicing => &self.providers.invoicing,
		}
	}

	/// Resolved runtime configs for every enabled provider.
	pub fn provider_configs(
		&self,
	) -> Result<BTreeMap<ProviderKind, ProviderConfig>, ConfigValidationError> {
		let mut configs = BTreeMap::new();
		for kind in ProviderKind::ALL {
			let settings = self.provider_settings(kind);
			if settings.enabled {
				configs.insert(kind, settings.to_provider_config(kind)?);
			}
		}
		Ok(configs)
	}

	/// Reject settings the pipeline cannot run with.
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		let buffer = self.insights.token_refresh_buffer_minutes;
		if !(5..=30).contains(&buffer) {
			return Err(ConfigValidationError::RefreshBufferOutOfRange { minutes: buffer });
		}
		for (field, value) in [
			("insights.max_window_days", self.insights.max_window_days as usize),
			(
				"insights.single_request_threshold_days",
				self.insights.single_request_threshold_days as usize,
			),
			("insights.tenant_concurrency", self.insights.tenant_concurrency),
			(
				"insights.refresh_all_concurrency",
				self.insights.refresh_all_concurrency,
			),
			(
				"insights.rolling_days_default",
				self.insights.rolling_days_default as usize,
			),
			("insights.max_range_days", self.insights.max_range_days as usize),
		] {
			if value == 0 {
				return Err(ConfigValidationError::ZeroNotAllowed { field });
			}
		}
		for kind in ProviderKind::ALL {
			let provider = self.provider_settings(kind);
			if !provider.enabled {
				continue;
			}
			for (field, value) in [
				("client_id", &provider.client_id),
				("auth_url", &provider.auth_url),
				("token_url", &provider.token_url),
				("api_base_url", &provider.api_base_url),
				("redirect_uri", &provider.redirect_uri),
			] {
				if value.trim().is_empty() {
					return Err(ConfigValidationError::MissingProviderField {
						provider: kind,
						field,
					});
				}
			}
		}
		Ok(())
	}
}
