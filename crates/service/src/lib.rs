//! Clinsight Service
//!
//! Business logic of the synchronization engine: token lifecycle, window
//! planning, concurrency-limited fetching, series merging, summary
//! derivation and the freshness-gated cache in front of it all.

pub mod cache;
pub mod fetch;
pub mod insights;
pub mod merge;
pub mod summary;
pub mod token;
pub mod windows;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::FreshnessGate;
pub use fetch::{BatchFetcher, FetchOutcome, RetryPolicy};
pub use insights::{FailedTenant, InsightsService, RefreshAllReport};
pub use merge::merge_windows;
pub use summary::{daily_breakdown, summarize, summarize_daily};
pub use token::{ConnectPrompt, TokenService};
pub use windows::plan_windows;
