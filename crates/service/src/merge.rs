//! Merging per-window provider results into one metric series

use clinsight_types::{MetricPoint, MetricSeries, WindowSeries};
use std::collections::BTreeMap;
use tracing::debug;

/// Merge the per-window series into one flat series per metric.
///
/// Windows are combined in planned sequence order, never arrival order, so
/// the merge is deterministic regardless of fetch completion order. When
/// two windows report a value for the same `(metric, date)` — which only
/// happens at the shared boundary date of adjacent windows, or on a
/// provider anomaly — the value from the earlier window wins. Each
/// metric's series comes out with unique dates in ascending order.
pub fn merge_windows(mut windows: Vec<WindowSeries>) -> MetricSeries {
	windows.sort_by_key(|w| w.sequence);

	let mut by_metric: BTreeMap<String, BTreeMap<chrono::NaiveDate, f64>> = BTreeMap::new();
	let mut duplicates = 0usize;

	for window in windows {
		for series in window.series {
			let points = by_metric.entry(series.metric).or_default();
			for point in series.points {
				// First-encountered value wins.
				if points.contains_key(&point.date) {
					duplicates += 1;
					continue;
				}
				points.insert(point.date, point.value);
			}
		}
	}

	if duplicates > 0 {
		debug!(duplicates, "dropped duplicate (metric, date) points during merge");
	}

	by_metric
		.into_iter()
		.map(|(metric, points)| {
			let series = points
				.into_iter()
				.map(|(date, value)| MetricPoint { date, value })
				.collect();
			(metric, series)
		})
		.collect()
}
