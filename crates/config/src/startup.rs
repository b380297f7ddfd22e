//! Service startup logging
//!
//! One readable block at boot covering the build, the environment and the
//! enabled providers, so an operator can tell from the first screen of
//! logs what this instance will talk to.

use crate::Settings;
use clinsight_types::ProviderKind;
use std::env;
use tracing::info;

/// Logs service and environment information at startup
pub fn log_service_info(settings: &Settings) {
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Clinsight Service Starting ===");
	info!("🚀 Service: clinsight v{}", service_version);
	info!("💻 Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}
	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Filter: {}", rust_log);
	}

	info!("🌍 Profile: {:?}", settings.environment.profile);

	for kind in ProviderKind::ALL {
		let provider = settings.provider_settings(kind);
		if provider.enabled {
			info!("🔌 Provider {}: enabled ({})", kind, provider.api_base_url);
		} else {
			info!("🔌 Provider {}: disabled", kind);
		}
	}

	info!(
		"🗓️ Windows: max {}d, single-request threshold {}d, rolling default {}d",
		settings.insights.max_window_days,
		settings.insights.single_request_threshold_days,
		settings.insights.rolling_days_default
	);
	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs service shutdown information
pub fn log_service_shutdown() {
	info!("🛑 Clinsight Service Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs startup completion once the listener is bound
pub fn log_startup_complete(bind_address: &str) {
	info!("✅ Clinsight Service Started Successfully");
	info!("🌐 Server listening on: {}", bind_address);
	info!("📡 Ready to accept requests");
}
