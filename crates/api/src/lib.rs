//! Clinsight API
//!
//! Axum-based API with routes and middleware for the analytics
//! synchronization engine.

pub mod auth;
pub mod handlers;
pub mod router;
pub mod security;
pub mod state;

pub use router::create_router;
pub use state::AppState;
