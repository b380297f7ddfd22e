//! Centralized mocks and fixtures for testing

pub mod fixtures;
pub mod test_server;

// Re-export commonly used items for convenience
#[allow(unused_imports)]
pub use fixtures::test_settings;
#[allow(unused_imports)]
pub use test_server::TestServer;
