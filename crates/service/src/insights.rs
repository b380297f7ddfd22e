//! Insights orchestration: cache gate, fetch pipeline and refresh sweeps
//!
//! One request flows cache-first: a fresh stored aggregate short-circuits
//! everything; otherwise the pipeline plans windows, fetches them under
//! the concurrency limit, merges the series, derives summary and daily
//! rows, and stores the result before returning it.

use chrono::Utc;
use clinsight_config::InsightsSettings;
use clinsight_storage::Storage;
use clinsight_types::{
	AggregatePeriod, AggregateResult, AggregateSource, InsightsError, InsightsRequest,
	InsightsResponse, InsightsResult, InsightsValidationError, ProviderKind, RequestedPeriod,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::FreshnessGate;
use crate::fetch::BatchFetcher;
use crate::merge::merge_windows;
use crate::summary::{daily_breakdown, summarize};
use crate::token::TokenService;
use crate::windows::plan_windows;

/// One tenant's outcome in a refresh-all sweep.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTenant {
	pub tenant_id: String,
	pub error: String,
}

/// Result of a refresh-all sweep over the tenant directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshAllReport {
	pub provider: ProviderKind,
	pub refreshed: Vec<String>,
	/// Tenants skipped because the provider is disconnected or flagged
	/// for re-authorization.
	pub skipped: Vec<String>,
	pub failed: Vec<FailedTenant>,
}

/// Entry point for everything the insights endpoints do.
pub struct InsightsService {
	storage: Storage,
	tokens: Arc<TokenService>,
	fetcher: BatchFetcher,
	gate: FreshnessGate,
	settings: InsightsSettings,
}

impl InsightsService {
	pub fn new(storage: Storage, tokens: Arc<TokenService>, settings: InsightsSettings) -> Self {
		let fetcher = BatchFetcher::new(&settings);
		let gate = FreshnessGate::new(storage.clone(), &settings);
		Self {
			storage,
			tokens,
			fetcher,
			gate,
			settings,
		}
	}

	pub fn tokens(&self) -> Arc<TokenService> {
		self.tokens.clone()
	}

	/// Rolling window used when a request names no period.
	pub fn rolling_days_default(&self) -> u32 {
		self.settings.rolling_days_default
	}

	/// Serve a validated insights request, with the optional comparison
	/// period computed the same cache-first way as the current one.
	pub async fn get_insights(&self, request: InsightsRequest) -> InsightsResult<InsightsResponse> {
		let today = Utc::now().date_naive();

		let days = request.period.span_days(today);
		if days > self.settings.max_range_days {
			return Err(InsightsValidationError::RangeTooLong {
				days,
				max_days: self.settings.max_range_days,
			}
			.into());
		}

		let current = self
			.aggregate_for_period(
				&request.tenant_id,
				request.provider,
				request.period,
				request.force_refresh,
			)
			.await?;

		let previous = if request.compare {
			let preceding = request.period.preceding(today);
			Some(
				self.aggregate_for_period(
					&request.tenant_id,
					request.provider,
					preceding,
					request.force_refresh,
				)
				.await?,
			)
		} else {
			None
		};

		Ok(InsightsResponse { current, previous })
	}

	/// Cache-first aggregate for one period.
	async fn aggregate_for_period(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		period: RequestedPeriod,
		force_refresh: bool,
	) -> InsightsResult<AggregateResult> {
		let today = Utc::now().date_naive();
		let signature = period.signature();
		let (start, end) = period.resolve(today);
		let resolved = AggregatePeriod::new(start, end);

		if let Some(cached) = self
			.gate
			.serve(
				tenant_id,
				provider,
				&signature,
				resolved,
				force_refresh,
				Utc::now(),
			)
			.await?
		{
			return Ok(cached);
		}

		let result = self.run_pipeline(tenant_id, provider, resolved).await?;
		self.gate.store(&signature, &result, Utc::now()).await?;
		Ok(result)
	}

	/// The live pipeline: plan, fetch, merge, summarize.
	async fn run_pipeline(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
		period: AggregatePeriod,
	) -> InsightsResult<AggregateResult> {
		let config = self.tokens.provider_config(provider)?.clone();

		// Surfaces disconnected or revoked credentials before any window
		// goes out.
		self.tokens.valid_access_token(tenant_id, provider).await?;
		let resource_id = self.tokens.resource_id(tenant_id, provider).await?;

		let windows = plan_windows(
			period.start,
			period.end,
			self.settings.max_window_days,
			self.settings.single_request_threshold_days,
		);
		let planned = windows.len();

		let outcome = self
			.fetcher
			.fetch_all(
				self.tokens.clone(),
				tenant_id,
				provider,
				config,
				resource_id,
				windows,
			)
			.await;

		if outcome.windows.is_empty() {
			if let Some(failure) = outcome.failures.first() {
				// Nothing usable came back; surface the first failure
				// instead of an empty aggregate.
				return Err(InsightsError::Upstream {
					transient: true,
					reason: format!(
						"all {planned} fetch units failed, first: {}",
						failure.error
					),
				});
			}
		}

		let merged = merge_windows(outcome.windows);
		let summary = summarize(provider, &merged);
		let daily = daily_breakdown(provider, &merged);
		let now = Utc::now();

		let result = AggregateResult {
			tenant_id: tenant_id.to_string(),
			provider,
			period,
			summary,
			daily_breakdown: daily,
			failed_units: outcome.failures,
			source: AggregateSource::Live,
			last_updated: now,
		};

		if let Err(e) = self.tokens.mark_synced(tenant_id, provider, now).await {
			warn!(tenant_id, provider = %provider, error = %e, "failed to record sync time");
		}

		info!(
			tenant_id,
			provider = %provider,
			start = %period.start,
			end = %period.end,
			windows = planned,
			failed_units = result.failed_units.len(),
			"pipeline run complete"
		);
		Ok(result)
	}

	/// Manual refresh: drop every cached aggregate for the pair, then
	/// recompute the default rolling window from live data.
	pub async fn refresh_tenant(
		&self,
		tenant_id: &str,
		provider: ProviderKind,
	) -> InsightsResult<AggregateResult> {
		self.gate.purge(tenant_id, provider).await?;
		self.aggregate_for_period(
			tenant_id,
			provider,
			RequestedPeriod::Rolling {
				days: self.settings.rolling_days_default,
			},
			true,
		)
		.await
	}

	/// Refresh every connected tenant for a provider, a bounded number at
	/// a time. Tenants needing re-authorization are skipped, not failed.
	pub async fn refresh_all(&self, provider: ProviderKind) -> InsightsResult<RefreshAllReport> {
		self.tokens.provider_config(provider)?;
		let tenants = self.storage.list_tenants().await?;

		let mut candidates = Vec::new();
		let mut skipped = Vec::new();
		for tenant in tenants {
			if tenant.is_connected(provider) {
				candidates.push(tenant.tenant_id);
			} else {
				skipped.push(tenant.tenant_id);
			}
		}

		let concurrency = self.settings.refresh_all_concurrency.max(1);
		let results: Vec<(String, InsightsResult<AggregateResult>)> = stream::iter(candidates)
			.map(|tenant_id| async move {
				let outcome = self.refresh_tenant(&tenant_id, provider).await;
				(tenant_id, outcome)
			})
			.buffer_unordered(concurrency)
			.collect()
			.await;

		let mut refreshed = Vec::new();
		let mut failed = Vec::new();
		for (tenant_id, outcome) in results {
			match outcome {
				Ok(_) => refreshed.push(tenant_id),
				Err(e) => {
					warn!(tenant_id = %tenant_id, provider = %provider, error = %e, "refresh-all tenant failed");
					failed.push(FailedTenant {
						tenant_id,
						error: e.to_string(),
					});
				},
			}
		}
		refreshed.sort();
		skipped.sort();
		failed.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));

		info!(
			provider = %provider,
			refreshed = refreshed.len(),
			skipped = skipped.len(),
			failed = failed.len(),
			"refresh-all sweep complete"
		);
		Ok(RefreshAllReport {
			provider,
			refreshed,
			skipped,
			failed,
		})
	}
}
