//! Clinsight Types
//!
//! Shared models and traits for the clinsight analytics synchronization
//! engine. This crate contains all domain models organized by business
//! entity, the provider adapter contract, and the storage traits the rest
//! of the workspace builds on.

pub mod auth;
pub mod credentials;
pub mod insights;
pub mod models;
pub mod providers;
pub mod storage;
pub mod summary;
pub mod tenants;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

// Re-export commonly used types for convenience
pub use credentials::{
	ConnectionCredential, ConnectionState, ConnectionStatus, RefreshOutcome, TokenError,
	TokenErrorKind, TokenGrant, TokenResult,
};

pub use insights::{
	AggregatePeriod, AggregateResult, AggregateSource, DailyEntry, FetchWindow, InsightsError,
	InsightsQuery, InsightsRequest, InsightsResponse, InsightsResult, InsightsValidationError,
	MetricPoint, MetricSeries, PeriodSignature, RawSeries, RequestedPeriod, StoredAggregate,
	UnitFailure, WindowSeries,
};

pub use providers::{
	ProviderAdapter, ProviderConfig, ProviderError, ProviderKind, ProviderResult,
	UnknownProviderError,
};

pub use summary::{bucket_table, source_metrics, SummaryBucket};

pub use tenants::{Tenant, TenantValidationError};

pub use auth::{
	ApiKeyAuthenticator, AuthContext, AuthError, AuthRequest, AuthResult, Authenticator,
	NoAuthenticator, Permission,
};

pub use models::SecretString;

pub use storage::{
	AggregateStore, StorageError, StorageResult, StorageStats, StorageTrait, TenantStore,
};
