//! Clinsight Server
//!
//! Main entry point for the synchronization engine server

use clinsight::InsightsBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Start the complete server with all defaults and setup handled automatically
	InsightsBuilder::new().start_server().await
}
