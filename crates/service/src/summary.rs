//! Deriving summary buckets and daily breakdowns from merged series
//!
//! Totals and the per-day breakdown are both computed from the same bucket
//! table, which makes `sum(daily[bucket]) == summary[bucket]` hold by
//! construction. The breakdown is never derived FROM the summary or vice
//! versa.

use chrono::NaiveDate;
use clinsight_types::summary::bucket_table;
use clinsight_types::{DailyEntry, MetricSeries, ProviderKind};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate totals per bucket across the whole merged series. Every
/// bucket in the provider's table appears, zero when no data arrived.
pub fn summarize(provider: ProviderKind, series: &MetricSeries) -> BTreeMap<String, f64> {
	let mut summary = BTreeMap::new();
	for bucket in bucket_table(provider) {
		let total: f64 = bucket
			.sources
			.iter()
			.filter_map(|source| series.get(*source))
			.flat_map(|points| points.iter().map(|p| p.value))
			.sum();
		summary.insert(bucket.bucket.to_string(), total);
	}
	summary
}

/// Per-day bucketed rows, ascending by date, reconstructed through the
/// same table as [`summarize`].
pub fn daily_breakdown(provider: ProviderKind, series: &MetricSeries) -> Vec<DailyEntry> {
	let table = bucket_table(provider);

	let dates: BTreeSet<NaiveDate> = table
		.iter()
		.flat_map(|bucket| bucket.sources.iter())
		.filter_map(|source| series.get(*source))
		.flat_map(|points| points.iter().map(|p| p.date))
		.collect();

	dates
		.into_iter()
		.map(|date| {
			let mut metrics = BTreeMap::new();
			for bucket in table {
				let value: f64 = bucket
					.sources
					.iter()
					.filter_map(|source| series.get(*source))
					.flat_map(|points| points.iter())
					.filter(|p| p.date == date)
					.map(|p| p.value)
					.sum();
				metrics.insert(bucket.bucket.to_string(), value);
			}
			DailyEntry { date, metrics }
		})
		.collect()
}

/// Column sums of already-bucketed daily rows. Used when re-slicing a
/// cached aggregate to a sub-range: the rows were built through the bucket
/// table, so summing them reproduces what [`summarize`] would compute over
/// the same days.
pub fn summarize_daily(provider: ProviderKind, daily: &[DailyEntry]) -> BTreeMap<String, f64> {
	let mut summary: BTreeMap<String, f64> = bucket_table(provider)
		.iter()
		.map(|bucket| (bucket.bucket.to_string(), 0.0))
		.collect();
	for entry in daily {
		for (bucket, value) in &entry.metrics {
			*summary.entry(bucket.clone()).or_insert(0.0) += value;
		}
	}
	summary
}

#[cfg(test)]
mod tests {
	use super::*;
	use clinsight_types::MetricPoint;

	fn date(d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
	}

	fn location_series() -> MetricSeries {
		let mut series = MetricSeries::new();
		for (metric, values) in [
			("impressions_desktop_maps", vec![(1, 10.0), (2, 20.0)]),
			("impressions_desktop_search", vec![(1, 5.0), (2, 15.0)]),
			("impressions_mobile_maps", vec![(1, 8.0)]),
			("impressions_mobile_search", vec![(2, 12.0)]),
			("call_clicks", vec![(1, 3.0), (2, 4.0)]),
			("website_clicks", vec![(1, 6.0)]),
			("direction_requests", vec![(2, 2.0)]),
		] {
			series.insert(
				metric.to_string(),
				values
					.into_iter()
					.map(|(d, v)| MetricPoint {
						date: date(d),
						value: v,
					})
					.collect(),
			);
		}
		series
	}

	#[test]
	fn views_sum_all_four_impression_surfaces() {
		let summary = summarize(ProviderKind::LocationInsights, &location_series());
		assert_eq!(summary["total_views"], 70.0);
		assert_eq!(summary["total_searches"], 32.0);
		assert_eq!(summary["total_calls"], 7.0);
		assert_eq!(summary["total_website_clicks"], 6.0);
		assert_eq!(summary["total_direction_requests"], 2.0);
	}

	#[test]
	fn daily_rows_cover_every_bucket_and_date() {
		let daily = daily_breakdown(ProviderKind::LocationInsights, &location_series());
		assert_eq!(daily.len(), 2);

		let day1 = &daily[0];
		assert_eq!(day1.date, date(1));
		assert_eq!(day1.metrics["total_views"], 23.0);
		assert_eq!(day1.metrics["total_searches"], 5.0);
		// No direction requests on day 1: present as zero, not missing.
		assert_eq!(day1.metrics["total_direction_requests"], 0.0);
	}

	#[test]
	fn daily_cross_sum_equals_summary() {
		for provider in ProviderKind::ALL {
			let series = match provider {
				ProviderKind::LocationInsights => location_series(),
				ProviderKind::Invoicing => {
					let mut series = MetricSeries::new();
					for (metric, values) in [
						("invoiced_total", vec![(1, 100.0), (2, 250.5)]),
						("collected_total", vec![(1, 80.0)]),
						("invoice_count", vec![(1, 2.0), (2, 3.0)]),
					] {
						series.insert(
							metric.to_string(),
							values
								.into_iter()
								.map(|(d, v)| MetricPoint {
									date: date(d),
									value: v,
								})
								.collect(),
						);
					}
					series
				},
			};

			let summary = summarize(provider, &series);
			let daily = daily_breakdown(provider, &series);
			let recomputed = summarize_daily(provider, &daily);
			assert_eq!(summary, recomputed, "{provider} cross-sum mismatch");
		}
	}

	#[test]
	fn empty_series_summarizes_to_zeroes() {
		let summary = summarize(ProviderKind::Invoicing, &MetricSeries::new());
		assert_eq!(summary.len(), 3);
		assert!(summary.values().all(|v| *v == 0.0));
		assert!(daily_breakdown(ProviderKind::Invoicing, &MetricSeries::new()).is_empty());
	}
}
