//! Core value types for the synchronization pipeline
//!
//! Everything the pipeline passes between stages lives here: fetch
//! windows, raw metric series, merged aggregates and the cached records
//! built from them.

pub mod errors;
pub mod request;

pub use errors::{InsightsError, InsightsResult, InsightsValidationError};
pub use request::{InsightsQuery, InsightsRequest, RequestedPeriod};

// Token errors sit with the credential model but surface through the same
// pipeline, so re-export them alongside the insights taxonomy.
pub use crate::credentials::{TokenError, TokenErrorKind, TokenResult};

use crate::providers::ProviderKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One bounded date sub-range of a fetch plan.
///
/// Consecutive windows share their boundary date (`end` of one equals
/// `start` of the next); providers return both endpoints, and the merge
/// step drops the duplicated seam points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
	pub start: NaiveDate,
	pub end: NaiveDate,
	/// Position in the plan; merge order is by this index, not by
	/// completion order.
	pub sequence: u32,
}

impl FetchWindow {
	pub fn span_days(&self) -> i64 {
		(self.end - self.start).num_days()
	}
}

impl fmt::Display for FetchWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{} {}..{}", self.sequence, self.start, self.end)
	}
}

/// A single dated metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
	pub date: NaiveDate,
	pub value: f64,
}

/// Merged series: metric key to date-ordered points with unique dates.
pub type MetricSeries = BTreeMap<String, Vec<MetricPoint>>;

/// One metric's points as returned by a provider for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
	pub metric: String,
	pub points: Vec<MetricPoint>,
}

/// Everything a provider returned for one fetch window, already past the
/// typed parse boundary.
#[derive(Debug, Clone)]
pub struct WindowSeries {
	pub sequence: u32,
	pub series: Vec<RawSeries>,
}

/// A window that failed after retries; siblings are unaffected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
	pub sequence: u32,
	pub start: NaiveDate,
	pub end: NaiveDate,
	pub error: String,
}

/// The period an aggregate covers. `days` is the difference between the
/// boundary dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePeriod {
	pub start: NaiveDate,
	pub end: NaiveDate,
	pub days: i64,
}

impl AggregatePeriod {
	pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
		Self {
			start,
			end,
			days: (end - start).num_days(),
		}
	}

	pub fn contains(&self, other: &AggregatePeriod) -> bool {
		self.start <= other.start && other.end <= self.end
	}
}

/// Whether an aggregate came out of the pipeline or the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateSource {
	Live,
	Cached,
}

/// One day of bucketed metrics. The bucket values flatten into the entry
/// so a row serializes as `{"date": ..., "total_views": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
	pub date: NaiveDate,
	#[serde(flatten)]
	pub metrics: BTreeMap<String, f64>,
}

/// The merged, summarized result of one pipeline run.
///
/// Superseded by the next run, never mutated in place; a manual refresh
/// deletes stored results before recomputing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
	pub tenant_id: String,
	pub provider: ProviderKind,
	pub period: AggregatePeriod,
	pub summary: BTreeMap<String, f64>,
	pub daily_breakdown: Vec<DailyEntry>,
	pub failed_units: Vec<UnitFailure>,
	pub source: AggregateSource,
	pub last_updated: DateTime<Utc>,
}

impl AggregateResult {
	pub fn is_complete(&self) -> bool {
		self.failed_units.is_empty()
	}
}

/// Insights endpoint response; `previous` is present when a comparison
/// period was requested.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
	pub current: AggregateResult,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub previous: Option<AggregateResult>,
}

/// Cache identity of a period.
///
/// Explicit ranges are keyed by their exact boundary dates. Rolling
/// requests ("last N days") are keyed by shape only, so yesterday's
/// record still serves today's request while it stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSignature {
	Range { start: NaiveDate, end: NaiveDate },
	Rolling { days: u32 },
}

impl PeriodSignature {
	pub fn key(&self) -> String {
		match self {
			PeriodSignature::Range { start, end } => format!("range:{}..{}", start, end),
			PeriodSignature::Rolling { days } => format!("rolling:{}d", days),
		}
	}

	pub fn is_rolling(&self) -> bool {
		matches!(self, PeriodSignature::Rolling { .. })
	}
}

impl fmt::Display for PeriodSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key())
	}
}

/// An aggregate at rest, with its cache identity and expiry.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAggregate {
	pub signature: String,
	pub result: AggregateResult,
	pub stored_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl StoredAggregate {
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signature_keys_are_stable() {
		let range = PeriodSignature::Range {
			start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
			end: NaiveDate::from_ymd_opt(2024, 4, 20).unwrap(),
		};
		assert_eq!(range.key(), "range:2024-01-01..2024-04-20");
		assert!(!range.is_rolling());

		let rolling = PeriodSignature::Rolling { days: 90 };
		assert_eq!(rolling.key(), "rolling:90d");
		assert!(rolling.is_rolling());
	}

	#[test]
	fn period_containment() {
		let outer = AggregatePeriod::new(
			NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
			NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
		);
		let inner = AggregatePeriod::new(
			NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
			NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
		);
		assert!(outer.contains(&inner));
		assert!(!inner.contains(&outer));
	}

	#[test]
	fn daily_entry_flattens_bucket_values() {
		let entry = DailyEntry {
			date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
			metrics: BTreeMap::from([("total_views".to_string(), 12.0)]),
		};
		let json = serde_json::to_value(&entry).unwrap();
		assert_eq!(json["date"], "2024-01-05");
		assert_eq!(json["total_views"], 12.0);
	}

	#[test]
	fn window_span_is_boundary_difference() {
		let window = FetchWindow {
			start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
			end: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
			sequence: 0,
		};
		assert_eq!(window.span_days(), 45);
	}
}
