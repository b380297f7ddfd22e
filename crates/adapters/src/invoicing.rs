//! Invoicing provider adapter
//!
//! Talks to the accounting platform's reporting API. Every call is scoped
//! to the company realm the OAuth callback handed over; the daily-sales
//! report rows become three metric series (invoiced, collected, count).

use async_trait::async_trait;
use chrono::NaiveDate;
use clinsight_types::{
	FetchWindow, MetricPoint, ProviderAdapter, ProviderConfig, ProviderError, ProviderKind,
	ProviderResult, RawSeries, SecretString, TokenGrant, WindowSeries,
};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::client::{build_client, map_request_error};
use crate::oauth;

/// Adapter for the invoicing provider.
#[derive(Debug)]
pub struct InvoicingAdapter {
	client: Client,
}

impl InvoicingAdapter {
	pub fn new() -> ProviderResult<Self> {
		Ok(Self {
			client: build_client()?,
		})
	}

	fn company_url(config: &ProviderConfig, realm_id: &str, path: &str) -> String {
		format!(
			"{}/companies/{}/{}",
			config.api_base_url.trim_end_matches('/'),
			realm_id,
			path
		)
	}

	fn realm<'a>(resource_id: Option<&'a str>) -> ProviderResult<&'a str> {
		resource_id.ok_or_else(|| ProviderError::InvalidRequest {
			reason: "company realm id is not set on the credential".to_string(),
		})
	}
}

// ================================
// WIRE MODELS
// ================================

/// Daily-sales report: one row per day with invoiced/collected totals.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailySalesResponse {
	#[serde(default)]
	rows: Vec<DailySalesRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailySalesRow {
	date: NaiveDate,
	invoiced_total: f64,
	collected_total: f64,
	invoice_count: f64,
}

/// Pivot the row-per-day report into per-metric series.
fn pivot_response(sequence: u32, response: DailySalesResponse) -> WindowSeries {
	let mut invoiced = Vec::with_capacity(response.rows.len());
	let mut collected = Vec::with_capacity(response.rows.len());
	let mut count = Vec::with_capacity(response.rows.len());

	for row in response.rows {
		invoiced.push(MetricPoint {
			date: row.date,
			value: row.invoiced_total,
		});
		collected.push(MetricPoint {
			date: row.date,
			value: row.collected_total,
		});
		count.push(MetricPoint {
			date: row.date,
			value: row.invoice_count,
		});
	}

	WindowSeries {
		sequence,
		series: vec![
			RawSeries {
				metric: "invoiced_total".to_string(),
				points: invoiced,
			},
			RawSeries {
				metric: "collected_total".to_string(),
				points: collected,
			},
			RawSeries {
				metric: "invoice_count".to_string(),
				points: count,
			},
		],
	}
}

#[async_trait]
impl ProviderAdapter for InvoicingAdapter {
	fn kind(&self) -> ProviderKind {
		ProviderKind::Invoicing
	}

	fn authorize_url(&self, config: &ProviderConfig, state: &str) -> ProviderResult<String> {
		let url = Url::parse_with_params(
			&config.auth_url,
			&[
				("client_id", config.client_id.as_str()),
				("redirect_uri", config.redirect_uri.as_str()),
				("response_type", "code"),
				("scope", &config.scope_param()),
				("state", state),
			],
		)
		.map_err(|e| ProviderError::InvalidRequest {
			reason: format!("invalid auth_url '{}': {}", config.auth_url, e),
		})?;
		Ok(url.into())
	}

	/// The callback query carries `realm_id`; the OAuth client passes it
	/// through onto the grant so it lands on the credential.
	async fn exchange_code(
		&self,
		config: &ProviderConfig,
		code: &str,
		realm_id: Option<&str>,
	) -> ProviderResult<TokenGrant> {
		oauth::exchange_code(&self.client, config, code, realm_id).await
	}

	async fn refresh_token(
		&self,
		config: &ProviderConfig,
		refresh_token: &SecretString,
	) -> ProviderResult<TokenGrant> {
		oauth::refresh(&self.client, config, refresh_token).await
	}

	async fn fetch_window(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
		window: &FetchWindow,
	) -> ProviderResult<WindowSeries> {
		let realm_id = Self::realm(resource_id)?;

		debug!(window = %window, realm_id, "fetching daily sales window");

		let response = self
			.client
			.get(Self::company_url(config, realm_id, "reports/daily-sales"))
			.timeout(Duration::from_millis(config.timeout_ms))
			.bearer_auth(access_token.expose_secret())
			.query(&[
				("start_date", window.start.to_string()),
				("end_date", window.end.to_string()),
			])
			.send()
			.await
			.map_err(|e| map_request_error(e, config.timeout_ms))?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let body = response.text().await.unwrap_or_default();
			return Err(ProviderError::from_http_failure(status, body));
		}

		let parsed: DailySalesResponse =
			response
				.json()
				.await
				.map_err(|e| ProviderError::InvalidResponse {
					reason: format!("malformed daily sales response: {}", e),
				})?;

		Ok(pivot_response(window.sequence, parsed))
	}

	async fn probe(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
	) -> ProviderResult<()> {
		let realm_id = Self::realm(resource_id)?;

		let response = self
			.client
			.get(Self::company_url(config, realm_id, "companyinfo"))
			.timeout(Duration::from_millis(config.timeout_ms))
			.bearer_auth(access_token.expose_secret())
			.send()
			.await
			.map_err(|e| map_request_error(e, config.timeout_ms))?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let body = response.text().await.unwrap_or_default();
			return Err(ProviderError::from_http_failure(status, body));
		}
		Ok(())
	}
}
