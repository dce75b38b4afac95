//! Usage summary shown next to the viewed list.
//!
//! Sizes are summed as `u64` bytes; floating point only appears while
//! scaling for display.

use serde::{Deserialize, Serialize};

use crate::registry::ViewedEntry;

const UNITS: &[&str] = &["KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Values at or above this move to the next unit. Deliberately 500, not 1024.
const SCALE_UP_THRESHOLD: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_count: usize,
    pub total_bytes: u64,
    pub formatted_size: String,
}

impl Default for AggregateStats {
    fn default() -> Self {
        compute_stats(&[])
    }
}

/// Count and size summary of `entries`.
pub fn compute_stats(entries: &[ViewedEntry]) -> AggregateStats {
    let total_bytes = entries
        .iter()
        .fold(0u64, |acc, e| acc.saturating_add(e.size_bytes));

    AggregateStats {
        total_count: entries.len(),
        total_bytes,
        formatted_size: format_size(total_bytes),
    }
}

/// Format a byte count starting from kilobytes.
///
/// `0` is "0 KB", `600 * 1024` is "0.6 MB". One decimal place is used only
/// when the value was scaled up at least once and ended below 10.
pub fn format_size(total_bytes: u64) -> String {
    let mut n = total_bytes as f64 / 1024.0;
    let mut unit = 0;

    while n >= SCALE_UP_THRESHOLD && unit + 1 < UNITS.len() {
        n /= 1024.0;
        unit += 1;
    }

    let precision = if n < 10.0 && unit > 0 { 1 } else { 0 };
    format!("{:.*} {}", precision, round_half_up(n, precision), UNITS[unit])
}

/// `{:.N}` rounds exact ties to even; ties here go to the larger value.
fn round_half_up(n: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (n * scale + 0.5).floor() / scale
}
