//! Shared primitive models used across tenants, providers and services

pub mod secret_string;

pub use secret_string::SecretString;
