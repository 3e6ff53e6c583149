use crate::models::{TrackedEntity, Trend};
use crate::rules::{ThresholdBasis, TrendPolicy};

const BASIS_POINTS: usize = 10_000;

pub fn classify_threshold(value: i64, rising_above: i64, falling_below: i64) -> Trend {
    if value > rising_above {
        Trend::Rising
    } else if value < falling_below {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

fn to_basis_points(fraction: f64) -> usize {
    (fraction.clamp(0.0, 1.0) * BASIS_POINTS as f64).round() as usize
}

/// Labels each input position by its rank in the ascending change
/// distribution. The sort is stable, so ties keep input order.
///
/// Falling takes precedence when the two ranges overlap (a batch of one).
pub fn classify_percentile(changes: &[i64], falling_fraction: f64, rising_from: f64) -> Vec<Trend> {
    let n = changes.len();
    let falling_bp = to_basis_points(falling_fraction);
    let rising_bp = to_basis_points(rising_from);
    let falling_cutoff = (n * falling_bp).div_ceil(BASIS_POINTS);
    let rising_cutoff = n * rising_bp / BASIS_POINTS;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&idx| changes[idx]);

    let mut trends = vec![Trend::Stable; n];
    for (position, idx) in order.into_iter().enumerate() {
        trends[idx] = if position < falling_cutoff {
            Trend::Falling
        } else if position >= rising_cutoff {
            Trend::Rising
        } else {
            Trend::Stable
        };
    }
    trends
}

/// Applies one policy to the whole batch.
pub fn assign_trends(batch: &mut [TrackedEntity], policy: &TrendPolicy) {
    match policy {
        TrendPolicy::Threshold {
            rising_above,
            falling_below,
            basis,
        } => {
            for entity in batch.iter_mut() {
                let value = match basis {
                    ThresholdBasis::ChangePct => entity.change_pct,
                    ThresholdBasis::Delta => entity.metric_delta(),
                };
                entity.trend = classify_threshold(value, *rising_above, *falling_below);
            }
        }
        TrendPolicy::Percentile {
            falling_fraction,
            rising_from,
        } => {
            let changes: Vec<i64> = batch.iter().map(|e| e.change_pct).collect();
            let trends = classify_percentile(&changes, *falling_fraction, *rising_from);
            for (entity, trend) in batch.iter_mut().zip(trends) {
                entity.trend = trend;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(trends: &[Trend], wanted: Trend) -> usize {
        trends.iter().filter(|t| **t == wanted).count()
    }

    #[test]
    fn threshold_has_dead_zone() {
        assert_eq!(classify_threshold(6, 5, -5), Trend::Rising);
        assert_eq!(classify_threshold(5, 5, -5), Trend::Stable);
        assert_eq!(classify_threshold(-5, 5, -5), Trend::Stable);
        assert_eq!(classify_threshold(-6, 5, -5), Trend::Falling);
    }

    #[test]
    fn twenty_entity_batch_splits_5_7_8() {
        let changes: Vec<i64> = (0..20).map(|i| i * 3 - 20).collect();
        let trends = classify_percentile(&changes, 0.25, 0.60);
        assert_eq!(count(&trends, Trend::Falling), 5);
        assert_eq!(count(&trends, Trend::Stable), 7);
        assert_eq!(count(&trends, Trend::Rising), 8);
        assert_eq!(trends[0], Trend::Falling);
        assert_eq!(trends[19], Trend::Rising);
    }

    #[test]
    fn partition_sizes_hold_for_all_batch_sizes() {
        for n in 2..=64usize {
            let changes: Vec<i64> = (0..n as i64).map(|i| (i * 7919) % 101 - 50).collect();
            let trends = classify_percentile(&changes, 0.25, 0.60);
            let falling = count(&trends, Trend::Falling);
            let rising = count(&trends, Trend::Rising);
            let stable = count(&trends, Trend::Stable);
            assert_eq!(falling + rising + stable, n);
            assert_eq!(falling, (n * 25).div_ceil(100), "n = {n}");
            assert_eq!(rising, n - n * 60 / 100, "n = {n}");
        }
    }

    #[test]
    fn labels_follow_input_positions() {
        let changes = vec![50, -30, 10, 0];
        let trends = classify_percentile(&changes, 0.25, 0.60);
        assert_eq!(trends, vec![Trend::Rising, Trend::Falling, Trend::Rising, Trend::Stable]);
    }

    #[test]
    fn ties_keep_input_order() {
        let changes = vec![0, 0, 0, 0];
        let trends = classify_percentile(&changes, 0.25, 0.60);
        assert_eq!(trends, vec![Trend::Falling, Trend::Stable, Trend::Rising, Trend::Rising]);
    }

    #[test]
    fn single_entity_is_falling() {
        assert_eq!(classify_percentile(&[42], 0.25, 0.60), vec![Trend::Falling]);
        assert!(classify_percentile(&[], 0.25, 0.60).is_empty());
    }
}
