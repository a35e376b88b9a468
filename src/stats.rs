//! Summary statistics shown on the plots. NaNs are ignored throughout.
use itertools::{Itertools, MinMaxResult};

use crate::config::PlotConfig;

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

/// Number of finite values
pub fn count(values: &[f64]) -> usize {
    finite(values).count()
}

pub fn median(values: &[f64]) -> Option<f64> {
    let sorted: Vec<f64> = finite(values).sorted_by(|a, b| a.total_cmp(b)).collect();
    let n = sorted.len();
    if n == 0 {
        None
    } else if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2]))
    }
}

/// Sample standard deviation (N - 1 in the denominator). Needs at least two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let n = count(values);
    if n < 2 {
        return None;
    }

    let mean = finite(values).sum::<f64>() / n as f64;
    let ss: f64 = finite(values).map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    match finite(values).minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

/// The range of values to show for `metric`.
///
/// Uses the fixed bounds configured for the metric where there are any and the
/// data minimum or maximum otherwise. Returns `None` if a bound is needed
/// from the data but there are no finite values.
pub fn value_range<'a, I>(columns: I, metric: &str, config: &PlotConfig) -> Option<(f64, f64)>
where I: IntoIterator<Item = &'a [f64]>
{
    let style = config.metrics.get(metric);
    let fixed_min = style.and_then(|s| s.min);
    let fixed_max = style.and_then(|s| s.max);

    if let (Some(lo), Some(hi)) = (fixed_min, fixed_max) {
        return Some((lo, hi));
    }

    let (data_min, data_max) = columns.into_iter()
        .filter_map(min_max)
        .reduce(|(lo1, hi1), (lo2, hi2)| (lo1.min(lo2), hi1.max(hi2)))?;
    Some((fixed_min.unwrap_or(data_min), fixed_max.unwrap_or(data_max)))
}
