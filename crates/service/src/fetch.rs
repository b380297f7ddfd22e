//! Concurrency-limited window fetching with per-unit failure isolation
//!
//! Every planned window becomes one fetch unit. Units run under a
//! semaphore sized by the per-tenant concurrency limit, retry transient
//! failures with doubling backoff, and fail independently: one dead
//! window never discards the data the other windows returned.

use clinsight_config::InsightsSettings;
use clinsight_types::{
	FetchWindow, InsightsError, ProviderConfig, ProviderKind, UnitFailure, WindowSeries,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::token::TokenService;

/// Bounded exponential backoff for transient unit failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_attempts: u32,
	pub base_delay: Duration,
}

impl RetryPolicy {
	pub fn from_settings(settings: &InsightsSettings) -> Self {
		Self {
			max_attempts: settings.retry_max_attempts,
			base_delay: Duration::from_millis(settings.retry_base_delay_ms),
		}
	}

	/// Delay before retry `attempt` (1-based), doubling per attempt.
	pub fn delay(&self, attempt: u32) -> Duration {
		self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
	}
}

/// What came back from a batch of fetch units.
#[derive(Debug)]
pub struct FetchOutcome {
	/// Successful windows, ascending by sequence index.
	pub windows: Vec<WindowSeries>,
	/// Units that exhausted their retries, ascending by sequence index.
	pub failures: Vec<UnitFailure>,
}

/// Runs the fetch units for one tenant request.
#[derive(Clone)]
pub struct BatchFetcher {
	concurrency: usize,
	inter_batch_delay: Duration,
	retry: RetryPolicy,
}

impl BatchFetcher {
	pub fn new(settings: &InsightsSettings) -> Self {
		Self {
			concurrency: settings.tenant_concurrency.max(1),
			inter_batch_delay: Duration::from_millis(settings.inter_batch_delay_ms),
			retry: RetryPolicy::from_settings(settings),
		}
	}

	/// Fetch every window, at most `tenant_concurrency` in flight at once.
	///
	/// Each unit goes through the token service wrapper, so an access token
	/// expiring mid-batch is refreshed once and the unit retried before it
	/// counts as failed.
	pub async fn fetch_all(
		&self,
		tokens: Arc<TokenService>,
		tenant_id: &str,
		provider: ProviderKind,
		config: ProviderConfig,
		resource_id: Option<String>,
		windows: Vec<FetchWindow>,
	) -> FetchOutcome {
		let semaphore = Arc::new(Semaphore::new(self.concurrency));
		let mut handles = Vec::with_capacity(windows.len());

		for window in windows {
			let tokens = tokens.clone();
			let tenant_id = tenant_id.to_string();
			let config = config.clone();
			let resource_id = resource_id.clone();
			let semaphore = semaphore.clone();
			let retry = self.retry;
			let pause = self.inter_batch_delay;

			let handle = tokio::spawn(async move {
				let _permit = match semaphore.acquire_owned().await {
					Ok(permit) => permit,
					Err(_) => {
						return Err(unit_failure(&window, "fetch pool closed".to_string()));
					},
				};

				let result =
					fetch_unit(&tokens, &tenant_id, provider, &config, &resource_id, window, retry)
						.await;

				// Space out calls to the same provider. The permit is held
				// through the pause so the next unit cannot start early.
				if !pause.is_zero() {
					tokio::time::sleep(pause).await;
				}

				result
			});
			handles.push((window, handle));
		}

		let mut succeeded = Vec::new();
		let mut failures = Vec::new();
		for (window, handle) in handles {
			match handle.await {
				Ok(Ok(series)) => succeeded.push(series),
				Ok(Err(failure)) => failures.push(failure),
				Err(e) => failures.push(unit_failure(&window, format!("fetch task failed: {e}"))),
			}
		}

		succeeded.sort_by_key(|w| w.sequence);
		failures.sort_by_key(|f| f.sequence);

		if !failures.is_empty() {
			warn!(
				tenant_id,
				provider = %provider,
				failed = failures.len(),
				succeeded = succeeded.len(),
				"some fetch units failed"
			);
		}

		FetchOutcome {
			windows: succeeded,
			failures,
		}
	}
}

async fn fetch_unit(
	tokens: &TokenService,
	tenant_id: &str,
	provider: ProviderKind,
	config: &ProviderConfig,
	resource_id: &Option<String>,
	window: FetchWindow,
	retry: RetryPolicy,
) -> Result<WindowSeries, UnitFailure> {
	let adapter = match tokens.adapter_for(provider) {
		Ok(adapter) => adapter,
		Err(e) => return Err(unit_failure(&window, e.to_string())),
	};

	let mut attempt = 0u32;
	loop {
		let result = tokens
			.with_valid_token(tenant_id, provider, |token| {
				let adapter = adapter.clone();
				let config = config.clone();
				let resource_id = resource_id.clone();
				async move {
					adapter
						.fetch_window(&config, &token, resource_id.as_deref(), &window)
						.await
				}
			})
			.await;

		match result {
			Ok(series) => return Ok(series),
			Err(e) if is_transient(&e) && attempt < retry.max_attempts => {
				attempt += 1;
				let delay = retry.delay(attempt);
				debug!(
					tenant_id,
					provider = %provider,
					sequence = window.sequence,
					attempt,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"retrying fetch unit"
				);
				tokio::time::sleep(delay).await;
			},
			Err(e) => return Err(unit_failure(&window, e.to_string())),
		}
	}
}

fn is_transient(err: &InsightsError) -> bool {
	matches!(
		err,
		InsightsError::RateLimited
			| InsightsError::Upstream {
				transient: true,
				..
			}
	)
}

fn unit_failure(window: &FetchWindow, error: String) -> UnitFailure {
	UnitFailure {
		sequence: window.sequence,
		start: window.start,
		end: window.end,
		error,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{connected_tenant, scripted_service, ScriptedProvider};
	use crate::windows::plan_windows;
	use chrono::NaiveDate;
	use clinsight_types::{ProviderAdapter, ProviderError};
	use std::sync::atomic::Ordering;

	fn settings() -> InsightsSettings {
		InsightsSettings {
			inter_batch_delay_ms: 0,
			retry_base_delay_ms: 1,
			..InsightsSettings::default()
		}
	}

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	async fn run_fetch(
		scripted: Arc<ScriptedProvider>,
		windows: Vec<FetchWindow>,
	) -> FetchOutcome {
		let provider = scripted.kind();
		let (tokens, _storage) =
			scripted_service(scripted, connected_tenant(provider, 3600)).await;
		let config = tokens.provider_config(provider).unwrap().clone();
		BatchFetcher::new(&settings())
			.fetch_all(
				Arc::new(tokens),
				"tenant-1",
				provider,
				config,
				Some("resource-1".to_string()),
				windows,
			)
			.await
	}

	#[tokio::test]
	async fn all_units_succeed_in_sequence_order() {
		let scripted = Arc::new(ScriptedProvider::new(ProviderKind::LocationInsights));
		let windows = plan_windows(date(2024, 1, 1), date(2024, 4, 20), 45, 60);

		let outcome = run_fetch(scripted.clone(), windows).await;
		assert_eq!(outcome.windows.len(), 3);
		assert!(outcome.failures.is_empty());
		let sequences: Vec<_> = outcome.windows.iter().map(|w| w.sequence).collect();
		assert_eq!(sequences, vec![0, 1, 2]);
		assert_eq!(scripted.fetch_calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn transient_failure_is_retried_to_success() {
		let scripted = Arc::new(ScriptedProvider::new(ProviderKind::Invoicing));
		scripted.fail_fetch(1, ProviderError::from_http_failure(503, "flaky".to_string()));
		let windows = plan_windows(date(2024, 1, 1), date(2024, 4, 20), 45, 60);

		let outcome = run_fetch(scripted.clone(), windows).await;
		assert_eq!(outcome.windows.len(), 3);
		assert!(outcome.failures.is_empty());
		// Three windows plus one retry of the flaky one.
		assert_eq!(scripted.fetch_calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn exhausted_unit_fails_alone() {
		let scripted = Arc::new(ScriptedProvider::new(ProviderKind::Invoicing));
		// Default policy allows two retries; three failures exhaust it.
		for _ in 0..3 {
			scripted.fail_fetch(1, ProviderError::from_http_failure(503, "down".to_string()));
		}
		let windows = plan_windows(date(2024, 1, 1), date(2024, 4, 20), 45, 60);

		let outcome = run_fetch(scripted, windows).await;
		assert_eq!(outcome.windows.len(), 2);
		assert_eq!(outcome.failures.len(), 1);

		let failure = &outcome.failures[0];
		assert_eq!(failure.sequence, 1);
		assert_eq!(failure.start, date(2024, 2, 15));
		assert_eq!(failure.end, date(2024, 3, 31));
	}

	#[tokio::test]
	async fn non_transient_failure_is_not_retried() {
		let scripted = Arc::new(ScriptedProvider::new(ProviderKind::Invoicing));
		scripted.fail_fetch(
			0,
			ProviderError::InvalidRequest {
				reason: "no company realm".to_string(),
			},
		);
		let windows = vec![FetchWindow {
			start: date(2024, 1, 1),
			end: date(2024, 1, 31),
			sequence: 0,
		}];

		let outcome = run_fetch(scripted.clone(), windows).await;
		assert!(outcome.windows.is_empty());
		assert_eq!(outcome.failures.len(), 1);
		assert_eq!(scripted.fetch_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn expired_token_mid_batch_refreshes_and_retries() {
		let provider = ProviderKind::Invoicing;
		let scripted = Arc::new(ScriptedProvider::new(provider));
		scripted.fail_fetch(0, ProviderError::from_http_failure(401, String::new()));
		scripted.push_refresh(Ok(clinsight_types::TokenGrant {
			access_token: clinsight_types::SecretString::from("access-1"),
			refresh_token: None,
			expires_in: 3600,
			realm_id: None,
		}));
		let windows = vec![FetchWindow {
			start: date(2024, 1, 1),
			end: date(2024, 1, 31),
			sequence: 0,
		}];

		let outcome = run_fetch(scripted.clone(), windows).await;
		assert_eq!(outcome.windows.len(), 1);
		assert!(outcome.failures.is_empty());
		assert_eq!(scripted.refresh_calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn backoff_doubles_per_attempt() {
		let retry = RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(250),
		};
		assert_eq!(retry.delay(1), Duration::from_millis(250));
		assert_eq!(retry.delay(2), Duration::from_millis(500));
		assert_eq!(retry.delay(3), Duration::from_millis(1000));
	}
}
