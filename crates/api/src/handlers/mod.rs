pub mod common;
pub mod connections;
pub mod health;
pub mod insights;

pub use connections::{callback, connect, connection_status, disconnect, refresh_connection};
pub use health::{health, ready};
pub use insights::{get_insights, refresh_all, refresh_insights};
