//! Configuration loading utilities

use crate::Settings;
use config::{Config, ConfigError, Environment, File};

/// Load settings from `config/config.{toml,yaml,json}` when present, then
/// apply `CLINSIGHT__`-prefixed environment overrides
/// (`CLINSIGHT__SERVER__PORT=8080`). Missing sections fall back to
/// defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
	let s = Config::builder()
		.add_source(File::with_name("config/config").required(false))
		.add_source(Environment::with_prefix("CLINSIGHT").separator("__"))
		.build()?;

	s.try_deserialize()
}
