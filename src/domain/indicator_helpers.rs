//! Shared helper functions for indicator calculations.

/// Wilder smoothing over a sparse series.
///
/// Seed: mean of the first `period` defined inputs. Afterwards
/// `avg = (prev * (period - 1) + x) / period`. An undefined input yields an
/// undefined output and leaves the running average untouched.
pub fn wilder_smooth(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let n = period as f64;
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut avg: Option<f64> = None;

    values
        .iter()
        .map(|&value| {
            let x = value?;
            match avg {
                None => {
                    seed_sum += x;
                    seen += 1;
                    if seen == period {
                        avg = Some(seed_sum / n);
                    }
                    avg
                }
                Some(prev) => {
                    let next = (prev * (n - 1.0) + x) / n;
                    avg = Some(next);
                    avg
                }
            }
        })
        .collect()
}

/// Lowest value over the trailing `period` entries; undefined if any entry is.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, f64::min)
}

/// Highest value over the trailing `period` entries; undefined if any entry is.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, f64::max)
}

fn rolling(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            if window.iter().any(|v| !v.is_finite()) {
                return None;
            }
            window.iter().copied().reduce(pick)
        })
        .collect()
}
