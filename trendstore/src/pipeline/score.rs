//! Metric normalization. Both policies resolve a zero denominator to 0.

/// Integer percentage change of `current` against `previous`.
pub fn change_pct(current: u64, previous: u64) -> i64 {
    if previous == 0 {
        return 0;
    }
    let pct = (current as f64 - previous as f64) / previous as f64 * 100.0;
    pct.round() as i64
}

/// Largest magnitude in the batch, never below 1.
pub fn max_magnitude(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().max().unwrap_or(0).max(1)
}

/// `round(100 * sqrt(raw) / sqrt(max))`, clamped to 0..=100.
pub fn sqrt_score(raw: u64, max: u64) -> u64 {
    let max = max.max(1) as f64;
    let score = (100.0 * (raw as f64).sqrt() / max.sqrt()).round();
    score.clamp(0.0, 100.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_pct_rounds_and_guards_zero() {
        assert_eq!(change_pct(110, 100), 10);
        assert_eq!(change_pct(90, 100), -10);
        assert_eq!(change_pct(1005, 1000), 1);
        assert_eq!(change_pct(50, 0), 0);
        assert_eq!(change_pct(0, 0), 0);
        assert_eq!(change_pct(0, 40), -100);
    }

    #[test]
    fn sqrt_score_bounds() {
        assert_eq!(sqrt_score(10_000, 10_000), 100);
        assert_eq!(sqrt_score(0, 10_000), 0);
        assert_eq!(sqrt_score(0, 0), 0);
    }

    #[test]
    fn sqrt_score_worked_example() {
        let raw = [("A", 10_000u64), ("B", 2_500), ("C", 0)];
        let max = max_magnitude(raw.iter().map(|(_, v)| *v));
        assert_eq!(max, 10_000);
        let scores: Vec<_> = raw.iter().map(|(k, v)| (*k, sqrt_score(*v, max))).collect();
        assert_eq!(scores, vec![("A", 100), ("B", 50), ("C", 0)]);
    }

    #[test]
    fn max_magnitude_has_floor_of_one() {
        assert_eq!(max_magnitude(Vec::new()), 1);
        assert_eq!(max_magnitude(vec![0, 0]), 1);
    }
}
