//! Shared settings fixtures for integration tests

use clinsight::Settings;
use clinsight_config::{ConfigurableValue, ProviderSettings};

fn enabled_provider(name: &str) -> ProviderSettings {
	ProviderSettings {
		enabled: true,
		client_id: format!("{name}-client"),
		client_secret: ConfigurableValue::from_plain("test-secret"),
		auth_url: format!("https://auth.{name}.test/authorize"),
		token_url: format!("https://auth.{name}.test/token"),
		api_base_url: format!("https://api.{name}.test"),
		redirect_uri: format!("http://localhost:3000/v1/connections/{name}/callback"),
		scopes: vec!["analytics.read".to_string()],
		timeout_ms: 1_000,
	}
}

/// Settings with both providers enabled and fast retry/backoff timings.
pub fn test_settings() -> Settings {
	let mut settings = Settings::default();
	settings.providers.location_insights = enabled_provider("location-insights");
	settings.providers.invoicing = enabled_provider("invoicing");
	settings.insights.inter_batch_delay_ms = 0;
	settings.insights.retry_base_delay_ms = 1;
	settings
}
