//! Declarative mapping from raw provider metrics to summary buckets
//!
//! The summarizer and the per-day breakdown both read these tables, which
//! is what guarantees that daily rows always sum to the summary totals. A
//! raw metric may feed more than one bucket.

use crate::providers::ProviderKind;

/// One named aggregate, summed from the listed raw metric keys.
#[derive(Debug, Clone, Copy)]
pub struct SummaryBucket {
	pub bucket: &'static str,
	pub sources: &'static [&'static str],
}

/// Location profile metrics. The four impression surfaces roll up into
/// total views; the two search surfaces also roll up into total searches.
pub const LOCATION_INSIGHTS_BUCKETS: &[SummaryBucket] = &[
	SummaryBucket {
		bucket: "total_views",
		sources: &[
			"impressions_desktop_maps",
			"impressions_desktop_search",
			"impressions_mobile_maps",
			"impressions_mobile_search",
		],
	},
	SummaryBucket {
		bucket: "total_searches",
		sources: &["impressions_desktop_search", "impressions_mobile_search"],
	},
	SummaryBucket {
		bucket: "total_calls",
		sources: &["call_clicks"],
	},
	SummaryBucket {
		bucket: "total_website_clicks",
		sources: &["website_clicks"],
	},
	SummaryBucket {
		bucket: "total_direction_requests",
		sources: &["direction_requests"],
	},
];

/// Invoicing analytics.
pub const INVOICING_BUCKETS: &[SummaryBucket] = &[
	SummaryBucket {
		bucket: "total_invoiced",
		sources: &["invoiced_total"],
	},
	SummaryBucket {
		bucket: "total_collected",
		sources: &["collected_total"],
	},
	SummaryBucket {
		bucket: "total_invoices",
		sources: &["invoice_count"],
	},
];

/// The bucket table for a provider.
pub fn bucket_table(kind: ProviderKind) -> &'static [SummaryBucket] {
	match kind {
		ProviderKind::LocationInsights => LOCATION_INSIGHTS_BUCKETS,
		ProviderKind::Invoicing => INVOICING_BUCKETS,
	}
}

/// Every raw metric a provider must be asked for, deduplicated in table
/// order.
pub fn source_metrics(kind: ProviderKind) -> Vec<&'static str> {
	let mut metrics = Vec::new();
	for bucket in bucket_table(kind) {
		for source in bucket.sources {
			if !metrics.contains(source) {
				metrics.push(*source);
			}
		}
	}
	metrics
}
