//! Date-range planning for provider-safe fetch windows

use chrono::{Duration, NaiveDate};
use clinsight_types::FetchWindow;

/// Split `[start, end]` into an ordered list of windows.
///
/// Ranges at or under `single_request_threshold_days` go out as one request
/// even when they exceed `max_window_days`; anything longer is walked in
/// `max_window_days` steps with the final window clipped to `end`.
///
/// The returned windows are contiguous (each window starts where the
/// previous one ends), never overlap beyond that shared boundary date, and
/// their union is exactly `[start, end]`.
pub fn plan_windows(
	start: NaiveDate,
	end: NaiveDate,
	max_window_days: u32,
	single_request_threshold_days: u32,
) -> Vec<FetchWindow> {
	debug_assert!(start <= end);
	debug_assert!(max_window_days > 0);

	let total_days = (end - start).num_days();
	if total_days <= single_request_threshold_days as i64 {
		return vec![FetchWindow {
			start,
			end,
			sequence: 0,
		}];
	}

	let step = Duration::days(max_window_days as i64);
	let mut windows = Vec::new();
	let mut cursor = start;
	let mut sequence = 0u32;

	while cursor < end {
		let window_end = (cursor + step).min(end);
		windows.push(FetchWindow {
			start: cursor,
			end: window_end,
			sequence,
		});
		cursor = window_end;
		sequence += 1;
	}

	windows
}

#[cfg(test)]
mod tests {
	use super::*;

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn assert_covers(windows: &[FetchWindow], start: NaiveDate, end: NaiveDate, max_days: u32) {
		assert_eq!(windows.first().unwrap().start, start);
		assert_eq!(windows.last().unwrap().end, end);
		for (index, window) in windows.iter().enumerate() {
			assert_eq!(window.sequence, index as u32);
			assert!(window.start < window.end || windows.len() == 1);
			assert!(window.span_days() <= max_days as i64);
			if index > 0 {
				// Contiguous: no gap, no overlap past the shared boundary.
				assert_eq!(windows[index - 1].end, window.start);
			}
		}
	}

	#[test]
	fn short_range_is_one_window() {
		let windows = plan_windows(date(2024, 1, 1), date(2024, 2, 15), 45, 60);
		assert_eq!(windows.len(), 1);
		assert_eq!(windows[0].start, date(2024, 1, 1));
		assert_eq!(windows[0].end, date(2024, 2, 15));
		assert_eq!(windows[0].sequence, 0);
	}

	#[test]
	fn threshold_allows_single_request_past_max_window() {
		// 50 days > max_window_days but <= threshold: still one request.
		let windows = plan_windows(date(2024, 1, 1), date(2024, 2, 20), 45, 60);
		assert_eq!(windows.len(), 1);
	}

	#[test]
	fn long_range_splits_into_clipped_windows() {
		// 110 days, 45-day windows: 45 + 45 + 20.
		let start = date(2024, 1, 1);
		let end = date(2024, 4, 20);
		let windows = plan_windows(start, end, 45, 60);

		assert_eq!(windows.len(), 3);
		assert_covers(&windows, start, end, 45);
		assert_eq!(windows[0].span_days(), 45);
		assert_eq!(windows[1].span_days(), 45);
		assert_eq!(windows[2].span_days(), 20);
	}

	#[test]
	fn exact_multiple_has_no_empty_tail() {
		// 90 days with 45-day windows: exactly two, no zero-length third.
		let windows = plan_windows(date(2024, 1, 1), date(2024, 3, 31), 45, 60);
		assert_eq!(windows.len(), 2);
		assert_eq!(windows[1].span_days(), 45);
	}

	#[test]
	fn zero_length_range_is_one_window() {
		let day = date(2024, 6, 1);
		let windows = plan_windows(day, day, 45, 60);
		assert_eq!(windows.len(), 1);
		assert_eq!(windows[0].span_days(), 0);
	}

	#[test]
	fn union_always_equals_requested_range() {
		for span in [61i64, 89, 90, 91, 180, 365] {
			let start = date(2023, 7, 1);
			let end = start + Duration::days(span);
			let windows = plan_windows(start, end, 45, 60);
			assert_covers(&windows, start, end, 45);
		}
	}
}
