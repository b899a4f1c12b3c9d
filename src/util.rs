/// Median of a set of millisecond durations, 0 for an empty set.
/// Works on a sorted copy; the caller's slice is left untouched.
pub fn median(data: &[u64]) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0.0,
        even if even % 2 == 0 => (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0,
        _ => sorted[mid] as f64,
    }
}

pub fn max_or_zero(data: &[u64]) -> u64 {
    data.iter().copied().max().unwrap_or(0)
}

/// Difference `later - earlier - spent`, clamped at zero
pub fn clamped_gap(earlier: i64, later: i64, spent: u64) -> u64 {
    let raw = i128::from(later) - i128::from(earlier) - i128::from(spent);
    u64::try_from(raw.max(0)).unwrap_or(u64::MAX)
}
