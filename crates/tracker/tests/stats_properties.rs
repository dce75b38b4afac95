use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use statsaver_tracker::stats::format_size;
use statsaver_tracker::{compute_stats, ViewedEntry};
use std::path::PathBuf;

fn entries_with_sizes(sizes: &[u64]) -> Vec<ViewedEntry> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| ViewedEntry {
            source_path: PathBuf::from(format!("/s/{}.jpg", i)),
            modified_at: Utc.timestamp_opt(i as i64, 0).unwrap(),
            size_bytes: *size,
        })
        .collect()
}

fn kb(n: u64) -> Vec<ViewedEntry> {
    entries_with_sizes(&[n * 1024])
}

#[test]
fn test_empty_registry() {
    let stats = compute_stats(&[]);
    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.formatted_size, "0 KB");
}

#[test]
fn test_hundred_kilobytes_stay_in_kb() {
    assert_eq!(compute_stats(&kb(100)).formatted_size, "100 KB");
}

#[test]
fn test_six_hundred_kilobytes_scale_to_mb() {
    assert_eq!(compute_stats(&kb(600)).formatted_size, "0.6 MB");
}

#[test]
fn test_five_thousand_kilobytes_keep_one_decimal() {
    assert_eq!(compute_stats(&kb(5000)).formatted_size, "4.9 MB");
}

#[test]
fn test_fifty_thousand_kilobytes_round_to_integer() {
    assert_eq!(compute_stats(&kb(50_000)).formatted_size, "49 MB");
}

#[test]
fn test_sizes_are_summed_across_entries() {
    let entries = entries_with_sizes(&[1024 * 200, 1024 * 200, 1024 * 200]);
    let stats = compute_stats(&entries);

    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.total_bytes, 1024 * 600);
    assert_eq!(stats.formatted_size, "0.6 MB");
}

#[test]
fn test_compute_stats_does_not_touch_input() {
    let entries = entries_with_sizes(&[10, 20, 30]);
    let before = entries.clone();
    let _ = compute_stats(&entries);
    assert_eq!(entries, before);
}

/// Every exact half kilobyte below the threshold rounds to the next integer.
#[test]
fn test_integer_ties_round_up_in_kilobytes() {
    for k in 0u64..500 {
        let bytes = (2 * k + 1) * 512;
        assert_eq!(format_size(bytes), format!("{} KB", k + 1), "bytes = {}", bytes);
    }
}

/// Exact .5 values at zero decimals in a scaled unit round up.
#[test]
fn test_integer_ties_round_up_after_scaling() {
    let mib = 1024 * 1024;
    for k in 10u64..499 {
        let bytes = (2 * k + 1) * mib / 2;
        assert_eq!(format_size(bytes), format!("{} MB", k + 1), "bytes = {}", bytes);
    }
    assert_eq!(format_size(25 * mib * 1024 / 2), "13 GB");
}

/// Exact .x5 values at one decimal round up: quarters q/4 with q odd.
#[test]
fn test_one_decimal_ties_round_up() {
    let mib = 1024 * 1024;
    for q in (3u64..40).step_by(2) {
        let bytes = q * mib / 4;
        let tenths = (5 * q + 1) / 2;
        let expected = format!("{}.{} MB", tenths / 10, tenths % 10);
        assert_eq!(format_size(bytes), expected, "bytes = {}", bytes);
    }
    assert_eq!(format_size(5 * mib * 1024 / 4), "1.3 GB");
    assert_eq!(format_size(1_310_720), "1.3 MB");
}

/// Formatted output is always "<number> <unit>", the number is below the
/// scale-up threshold unless the table ran out, and the decimal policy
/// follows the unit.
#[test]
fn property_format_size_shape() {
    proptest!(|(bytes in any::<u64>())| {
        let formatted = format_size(bytes);
        let (number, unit) = formatted.split_once(' ').expect("missing unit separator");

        let units = ["KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
        let unit_index = units.iter().position(|u| *u == unit);
        prop_assert!(unit_index.is_some(), "Unknown unit {}", unit);
        let unit_index = unit_index.unwrap();

        let value: f64 = number.parse().expect("number should parse");
        prop_assert!(value < 500.5, "Value {} should have been scaled up", value);

        let scaled = unit_index > 0;
        if number.contains('.') {
            prop_assert!(scaled, "Decimals only after scaling: {}", formatted);
            prop_assert_eq!(number.split('.').nth(1).map(|d| d.len()), Some(1));
        }
        if !scaled {
            prop_assert!(!number.contains('.'), "KB is always an integer: {}", formatted);
        }
    });
}

/// Below 500 KB the output is the kilobyte count rounded half up.
#[test]
fn property_small_totals_stay_in_kilobytes() {
    proptest!(|(bytes in 0u64..(500 * 1024))| {
        let expected = format!("{} KB", (bytes + 512) / 1024);
        prop_assert_eq!(format_size(bytes), expected);
    });
}

/// Adding bytes never makes the reported unit smaller.
#[test]
fn property_unit_is_monotonic() {
    proptest!(|(a in 0u64..(1u64 << 50), b in 0u64..(1u64 << 50))| {
        let units = ["KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
        let unit_of = |bytes: u64| {
            let formatted = format_size(bytes);
            let unit = formatted.rsplit(' ').next().unwrap().to_string();
            units.iter().position(|u| *u == unit).unwrap()
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(unit_of(lo) <= unit_of(hi));
    });
}
