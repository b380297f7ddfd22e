use std::sync::Arc;

use clinsight_service::{InsightsService, TokenService};
use clinsight_storage::Storage;
use clinsight_types::Authenticator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
	pub insights_service: Arc<InsightsService>,
	pub token_service: Arc<TokenService>,
	pub storage: Storage,
	pub authenticator: Arc<dyn Authenticator>,
}
