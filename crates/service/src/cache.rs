//! Freshness-gated serving of stored aggregates
//!
//! The cache is keyed by period signature: explicit ranges by their exact
//! boundary dates, rolling windows by shape. A fresh record is served
//! as-is; a fresh wider record can be re-sliced to answer a narrower
//! explicit range without touching the provider. Everything else falls
//! through to the live pipeline.

use chrono::{DateTime, Duration, Utc};
use clinsight_config::InsightsSettings;
use clinsight_storage::Storage;
use clinsight_types::{
	AggregatePeriod, AggregateResult, AggregateSource, InsightsResult, PeriodSignature,
	ProviderKind, StoredAggregate,
};
use tracing::debug;

use crate::summary::summarize_daily;

/// Decides when a stored aggregate may be served instead of recomputed.
#[derive(Clone)]
pub struct FreshnessGate {
	storage: Storage,
	ttl_range: Duration,
	ttl_rolling: Duration,
}

impl FreshnessGate {
	pub fn new(storage: Storage, settings: &InsightsSettings) -> Self {
		Self {
			storage,
			ttl_range: Duration::hours(settings.cache_ttl_range_hours),
			ttl_rolling: Duration::hours(settings.cache_ttl_rolling_hours),
		}
	}

	fn ttl_for(&self, signature: &PeriodSignature) -> Duration {
		if signature.is_rolling() {
			self.ttl_rolling
		} else {
			self.ttl_range
		}
	}

	/// A cached aggregate for the requested period, or `None` when the
	/// pipeline has to run. `force_refresh` always falls through.
	pub async fn serve(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		signature: &PeriodSignature,
		period: AggregatePeriod,
		force_refresh: bool,
		now: DateTime<Utc>,
	) -> InsightsResult<Option<AggregateResult>> {
		if force_refresh {
			return Ok(None);
		}

		if let Some(record) = self
			.storage
			.get_aggregate(tenant_id, provider, &signature.key())
			.await?
		{
			if !record.is_expired(now) {
				debug!(tenant_id, provider = %provider, signature = %signature, "cache hit");
				return Ok(Some(as_cached(record.result)));
			}
		}

		// An exact range can also be answered by any fresh record whose
		// period covers it: filter its daily rows and re-sum them.
		if let PeriodSignature::Range { .. } = signature {
			for record in self.storage.list_aggregates(tenant_id, provider).await? {
				if record.is_expired(now) || !record.result.period.contains(&period) {
					continue;
				}
				debug!(
					tenant_id,
					provider = %provider,
					signature = %signature,
					covering = %record.signature,
					"serving sub-range from wider cached aggregate"
				);
				return Ok(Some(reslice(record, period)));
			}
		}

		Ok(None)
	}

	/// Store a pipeline result under its signature, replacing any previous
	/// record for the same period.
	pub async fn store(
		&self,
		signature: &PeriodSignature,
		result: &AggregateResult,
		now: DateTime<Utc>,
	) -> InsightsResult<()> {
		let record = StoredAggregate {
			signature: signature.key(),
			result: result.clone(),
			stored_at: now,
			expires_at: now + self.ttl_for(signature),
		};
		self.storage
			.put_aggregate(&result.tenant_id, result.provider, record)
			.await?;
		Ok(())
	}

	/// Drop every stored aggregate for a tenant and provider. Manual
	/// refreshes call this first so stale periods cannot outlive the data
	/// they were derived from.
	pub async fn purge(&self, tenant_id: &str, provider: ProviderKind) -> InsightsResult<usize> {
		let removed = self.storage.delete_aggregates(tenant_id, provider).await?;
		if removed > 0 {
			debug!(tenant_id, provider = %provider, removed, "purged cached aggregates");
		}
		Ok(removed)
	}
}

fn as_cached(mut result: AggregateResult) -> AggregateResult {
	result.source = AggregateSource::Cached;
	result
}

/// Cut a wider cached aggregate down to `period`. The daily rows are
/// already bucketed, so the sub-range summary is their column sums.
fn reslice(record: StoredAggregate, period: AggregatePeriod) -> AggregateResult {
	let result = record.result;
	let daily_breakdown: Vec<_> = result
		.daily_breakdown
		.into_iter()
		.filter(|entry| period.start <= entry.date && entry.date <= period.end)
		.collect();
	let summary = summarize_daily(result.provider, &daily_breakdown);

	AggregateResult {
		tenant_id: result.tenant_id,
		provider: result.provider,
		period,
		summary,
		daily_breakdown,
		failed_units: result.failed_units,
		source: AggregateSource::Cached,
		last_updated: result.last_updated,
	}
}
