//! Operations on one competitor's chronological series
//!
//! Values are `f64` with NaN marking a missing observation. Window
//! statistics skip NaN and require `min_periods` real observations.

/// Move every value one position later; the first becomes missing
pub fn shift(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    out.extend_from_slice(&values[..values.len() - 1]);
    out
}

/// Difference from the previous value; the first is missing
pub fn diff(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if i == 0 { f64::NAN } else { v - values[i - 1] })
        .collect()
}

fn window_values(values: &[f64], end: usize, window: usize) -> impl Iterator<Item = f64> + '_ {
    let start = (end + 1).saturating_sub(window);
    values[start..=end].iter().copied().filter(|v| !v.is_nan())
}

/// Mean over the trailing window ending at each position
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let observed: Vec<f64> = window_values(values, i, window).collect();
            if observed.len() < min_periods.max(1) {
                f64::NAN
            } else {
                observed.iter().sum::<f64>() / observed.len() as f64
            }
        })
        .collect()
}

/// Sample standard deviation over the trailing window ending at each position
pub fn rolling_std(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let observed: Vec<f64> = window_values(values, i, window).collect();
            if observed.len() < min_periods.max(2) {
                f64::NAN
            } else {
                sample_std(&observed)
            }
        })
        .collect()
}

/// Mean of every observation up to and including each position
pub fn expanding_mean(values: &[f64]) -> Vec<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    values
        .iter()
        .map(|v| {
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Running total with missing values counted as zero
pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            if !v.is_nan() {
                total += v;
            }
            total
        })
        .collect()
}

/// Carry the last observed value forward over missing positions
pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|v| {
            if !v.is_nan() {
                last = *v;
            }
            last
        })
        .collect()
}

/// Run length of `target` values in an outcome series.
///
/// A counter restarts at 0 on the first position and whenever the value
/// differs from the previous one, otherwise it increments. The streak is
/// the counter where the value equals `target` and 0 elsewhere. Missing
/// values break runs.
pub fn streak(values: &[f64], target: f64) -> Vec<f64> {
    let mut counter = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let continues = i > 0 && !v.is_nan() && *v == values[i - 1];
            counter = if continues { counter + 1.0 } else { 0.0 };
            if *v == target {
                counter
            } else {
                0.0
            }
        })
        .collect()
}

/// Replace missing values with `fill`
pub fn fill_missing(values: &mut [f64], fill: f64) {
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = fill;
        }
    }
}

/// Mean of the observed values
pub fn mean(values: &[f64]) -> Option<f64> {
    let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    Some(observed.iter().sum::<f64>() / observed.len() as f64)
}

/// Median of the observed values
pub fn median(values: &[f64]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(|a, b| a.total_cmp(b));
    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        Some((observed[mid - 1] + observed[mid]) / 2.0)
    } else {
        Some(observed[mid])
    }
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    fn assert_series(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            if e.is_nan() {
                assert!(a.is_nan(), "expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-9, "expected {e}, got {a}");
            }
        }
    }

    #[test]
    fn test_shift_and_diff() {
        assert_series(&shift(&[1.0, 2.0, 3.0]), &[NAN, 1.0, 2.0]);
        assert_series(&diff(&[10.0, 15.0, 30.0]), &[NAN, 5.0, 15.0]);
        assert!(shift(&[]).is_empty());
    }

    #[test]
    fn test_rolling_mean_skips_missing() {
        let values = [NAN, 1.0, 0.0, 1.0, NAN, 1.0, 1.0];
        assert_series(
            &rolling_mean(&values, 3, 1),
            &[NAN, 1.0, 0.5, 2.0 / 3.0, 0.5, 1.0, 1.0],
        );
    }

    #[test]
    fn test_rolling_std_needs_two_observations() {
        let values = [NAN, 1.0, 3.0, 5.0];
        assert_series(&rolling_std(&values, 5, 2), &[NAN, NAN, 2.0_f64.sqrt(), 2.0]);
    }

    #[test]
    fn test_expanding_and_cumulative() {
        let values = [NAN, 1.0, 0.0, 1.0];
        assert_series(&expanding_mean(&values), &[NAN, 1.0, 0.5, 2.0 / 3.0]);
        assert_series(&cumulative_sum(&values), &[0.0, 1.0, 1.0, 2.0]);
        assert_series(&forward_fill(&[NAN, 4.0, NAN, 7.0, NAN]), &[NAN, 4.0, 4.0, 7.0, 7.0]);
    }

    #[test]
    fn test_streak_reset_on_change() {
        let outcomes = [1.0, 1.0, 0.0, 1.0];
        assert_series(&streak(&outcomes, 1.0), &[0.0, 1.0, 0.0, 0.0]);
        assert_series(&streak(&outcomes, 0.0), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_streak_first_fight_and_gaps() {
        let outcomes = [NAN, 1.0, 1.0, 1.0, NAN, 0.0, 0.0];
        assert_series(&streak(&outcomes, 1.0), &[0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_series(&streak(&outcomes, 0.0), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_median_and_mean() {
        assert_eq!(median(&[3.0, NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[NAN]), None);
        assert_eq!(mean(&[1.0, NAN, 3.0]), Some(2.0));
    }
}
