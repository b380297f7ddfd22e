//! Insights request parsing and validation
//!
//! Query parameters are validated into an [`InsightsRequest`] before any
//! network or storage call happens; a malformed range never reaches the
//! pipeline.

use super::{InsightsValidationError, PeriodSignature};
use crate::providers::ProviderKind;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;

/// Longest rolling window a caller may request.
pub const MAX_ROLLING_DAYS: u32 = 365;

/// Raw query parameters of the insights endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightsQuery {
	pub start: Option<NaiveDate>,
	pub end: Option<NaiveDate>,
	pub days: Option<u32>,
	pub compare: bool,
	pub force_refresh: bool,
}

/// The period shape a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedPeriod {
	/// Explicit boundary dates.
	Range { start: NaiveDate, end: NaiveDate },
	/// Trailing window ending today.
	Rolling { days: u32 },
}

impl RequestedPeriod {
	/// Concrete boundary dates for this period.
	pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
		match self {
			RequestedPeriod::Range { start, end } => (*start, *end),
			RequestedPeriod::Rolling { days } => (today - Duration::days(*days as i64), today),
		}
	}

	pub fn signature(&self) -> PeriodSignature {
		match self {
			RequestedPeriod::Range { start, end } => PeriodSignature::Range {
				start: *start,
				end: *end,
			},
			RequestedPeriod::Rolling { days } => PeriodSignature::Rolling { days: *days },
		}
	}

	pub fn span_days(&self, today: NaiveDate) -> i64 {
		let (start, end) = self.resolve(today);
		(end - start).num_days()
	}

	/// The equal-length period ending the day before this one starts,
	/// used for `compare=true`.
	pub fn preceding(&self, today: NaiveDate) -> RequestedPeriod {
		let (start, end) = self.resolve(today);
		let span = end - start;
		RequestedPeriod::Range {
			start: start - span - Duration::days(1),
			end: start - Duration::days(1),
		}
	}
}

/// A validated insights request.
#[derive(Debug, Clone)]
pub struct InsightsRequest {
	pub tenant_id: String,
	pub provider: ProviderKind,
	pub period: RequestedPeriod,
	pub compare: bool,
	pub force_refresh: bool,
}

impl InsightsQuery {
	/// Validate raw query parameters into a request.
	///
	/// `default_days` is the rolling window used when the caller names no
	/// period at all.
	pub fn into_request(
		self,
		tenant_id: &str,
		provider: ProviderKind,
		today: NaiveDate,
		default_days: u32,
	) -> Result<InsightsRequest, InsightsValidationError> {
		if tenant_id.trim().is_empty() {
			return Err(InsightsValidationError::EmptyTenantId);
		}

		let period = match (self.start, self.end, self.days) {
			(Some(_), Some(_), Some(_)) => {
				return Err(InsightsValidationError::InvalidDateRange {
					reason: "provide either start/end or days, not both".to_string(),
				});
			},
			(Some(start), Some(end), None) => {
				if start > end {
					return Err(InsightsValidationError::InvalidDateRange {
						reason: format!("start {} is after end {}", start, end),
					});
				}
				if end > today {
					return Err(InsightsValidationError::InvalidDateRange {
						reason: format!("end {} is in the future", end),
					});
				}
				RequestedPeriod::Range { start, end }
			},
			(None, None, Some(days)) => {
				if days == 0 || days > MAX_ROLLING_DAYS {
					return Err(InsightsValidationError::InvalidDays { days });
				}
				RequestedPeriod::Rolling { days }
			},
			(None, None, None) => RequestedPeriod::Rolling { days: default_days },
			_ => {
				return Err(InsightsValidationError::InvalidDateRange {
					reason: "start and end must be provided together".to_string(),
				});
			},
		};

		Ok(InsightsRequest {
			tenant_id: tenant_id.to_string(),
			provider,
			period,
			compare: self.compare,
			force_refresh: self.force_refresh,
		})
	}
}
