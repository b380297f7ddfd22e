//! Location-insights provider adapter
//!
//! Talks to the business-profile analytics API: daily impression, call,
//! website-click and direction-request series for one location. The wire
//! format groups series by surface; [`flatten_response`] is the single
//! parse boundary between that shape and the engine's [`WindowSeries`].

use async_trait::async_trait;
use chrono::NaiveDate;
use clinsight_types::summary::source_metrics;
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

/// Adapter for the location-insights provider.
#[derive(Debug)]
pub struct LocationInsightsAdapter {
	client: Client,
}

impl LocationInsightsAdapter {
	pub fn new() -> ProviderResult<Self> {
		Ok(Self {
			client: build_client()?,
		})
	}

	fn metrics_url(config: &ProviderConfig, location_id: &str) -> String {
		format!(
			"{}/locations/{}/metrics:fetch",
			config.api_base_url.trim_end_matches('/'),
			location_id
		)
	}
}

// ================================
// WIRE MODELS
// ================================

/// Daily metrics response: series grouped by reporting surface.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyMetricsResponse {
	#[serde(default)]
	metric_groups: Vec<MetricGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricGroup {
	#[serde(default)]
	series: Vec<MetricTimeSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricTimeSeries {
	metric: String,
	#[serde(default)]
	points: Vec<DatedValue>,
}

#[derive(Debug, Deserialize)]
struct DatedValue {
	date: NaiveDate,
	value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationsResponse {
	#[serde(default)]
	locations: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
	location_id: String,
}

/// Flatten the grouped wire shape into per-metric series. Group boundaries
/// carry no meaning past this point.
fn flatten_response(sequence: u32, response: DailyMetricsResponse) -> WindowSeries {
	let mut series = Vec::new();
	for group in response.metric_groups {
		for entry in group.series {
			series.push(RawSeries {
				metric: entry.metric,
				points: entry
					.points
					.into_iter()
					.map(|p| MetricPoint {
						date: p.date,
						value: p.value,
					})
					.collect(),
			});
		}
	}
	WindowSeries { sequence, series }
}

#[async_trait]
impl ProviderAdapter for LocationInsightsAdapter {
	fn kind(&self) -> ProviderKind {
		ProviderKind::LocationInsights
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
				("access_type", "offline"),
				("prompt", "consent"),
			],
		)
		.map_err(|e| ProviderError::InvalidRequest {
			reason: format!("invalid auth_url '{}': {}", config.auth_url, e),
		})?;
		Ok(url.into())
	}

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

	/// The callback carries no location id; pick the first location the
	/// account exposes.
	async fn discover_resource(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
	) -> ProviderResult<Option<String>> {
		let url = format!("{}/locations", config.api_base_url.trim_end_matches('/'));
		let response = self
			.client
			.get(&url)
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

		let parsed: LocationsResponse =
			response
				.json()
				.await
				.map_err(|e| ProviderError::InvalidResponse {
					reason: format!("malformed locations response: {}", e),
				})?;

		Ok(parsed.locations.into_iter().next().map(|l| l.location_id))
	}

	async fn fetch_window(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
		window: &FetchWindow,
	) -> ProviderResult<WindowSeries> {
		let location_id = resource_id.ok_or_else(|| ProviderError::InvalidRequest {
			reason: "location id is not set on the credential".to_string(),
		})?;

		debug!(window = %window, location_id, "fetching location metrics window");

		let body = serde_json::json!({
			"metrics": source_metrics(ProviderKind::LocationInsights),
			"startDate": window.start,
			"endDate": window.end,
		});

		let response = self
			.client
			.post(Self::metrics_url(config, location_id))
			.timeout(Duration::from_millis(config.timeout_ms))
			.bearer_auth(access_token.expose_secret())
			.json(&body)
			.send()
			.await
			.map_err(|e| map_request_error(e, config.timeout_ms))?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let body = response.text().await.unwrap_or_default();
			return Err(ProviderError::from_http_failure(status, body));
		}

		let parsed: DailyMetricsResponse =
			response
				.json()
				.await
				.map_err(|e| ProviderError::InvalidResponse {
					reason: format!("malformed metrics response: {}", e),
				})?;

		Ok(flatten_response(window.sequence, parsed))
	}

	async fn probe(
		&self,
		config: &ProviderConfig,
		access_token: &SecretString,
		resource_id: Option<&str>,
	) -> ProviderResult<()> {
		let location_id = resource_id.ok_or_else(|| ProviderError::InvalidRequest {
			reason: "location id is not set on the credential".to_string(),
		})?;

		let body = serde_json::json!({
			"metrics": ["call_clicks"],
			"startDate": chrono::Utc::now().date_naive() - chrono::Duration::days(7),
			"endDate": chrono::Utc::now().date_naive(),
		});

		let response = self
			.client
			.post(Self::metrics_url(config, location_id))
			.timeout(Duration::from_millis(config.timeout_ms))
			.bearer_auth(access_token.expose_secret())
			.json(&body)
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
