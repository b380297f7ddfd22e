//! Authentication and authorization module

pub mod middleware;

pub use middleware::*;
