//! Clinsight Configuration
//!
//! Settings structures, file/environment loading, secret resolution and
//! startup logging for the analytics synchronization engine.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::load_config;
pub use settings::{
	ConfigValidationError, EnvironmentProfile, EnvironmentSettings, InsightsSettings, LogFormat,
	LoggingSettings, ProviderSettings, ProvidersSettings, SecuritySettings, ServerSettings,
	Settings,
};
pub use startup::{log_service_info, log_service_shutdown, log_startup_complete};
