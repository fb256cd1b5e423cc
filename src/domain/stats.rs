//! Descriptive statistics shared by the analytics modules.
//!
//! Conventions: standard deviations are sample estimates (n - 1) unless the
//! name says otherwise, percentiles interpolate linearly between closest ranks,
//! skewness and kurtosis are the bias-corrected sample estimators (excess
//! kurtosis). Degenerate inputs resolve to 0.0 instead of NaN.

use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Percentile with linear interpolation, `q` in [0, 1].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, q)
}

/// Same as [`percentile`] for data already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 0.5)
}

pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let nf = n as f64;
    let m = mean(values);
    let m2: f64 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    let m3: f64 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    if m2 <= (1e-12 * m.abs()).powi(2) {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
}

/// Excess kurtosis (normal = 0).
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 {
        return 0.0;
    }
    let nf = n as f64;
    let m = mean(values);
    let s2: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    let s4: f64 = values.iter().map(|v| (v - m).powi(4)).sum();
    if s2 / nf <= (1e-12 * m.abs()).powi(2) {
        return 0.0;
    }
    let numerator = nf * (nf + 1.0) * (nf - 1.0) * s4;
    let denominator = (nf - 2.0) * (nf - 3.0) * s2 * s2;
    let adjustment = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    numerator / denominator - adjustment
}

/// Sample covariance of two equally long slices.
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let ma = mean(&a[..n]);
    let mb = mean(&b[..n]);
    let s: f64 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum();
    s / (n - 1) as f64
}

/// Pearson correlation; 0.0 when either side has no variance.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let sa = std_dev(&a[..n]);
    let sb = std_dev(&b[..n]);
    if sa == 0.0 || sb == 0.0 {
        return 0.0;
    }
    covariance(a, b) / (sa * sb)
}

/// Largest peak-to-trough decline of a value curve, as a positive fraction.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in curve {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Growth index `prod(1 + r)` for a return series.
pub fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc
        })
        .collect()
}

/// Mean of the values at or below `threshold`, if any qualify.
pub fn tail_mean(values: &[f64], threshold: f64) -> Option<f64> {
    let tail: Vec<f64> = values.iter().copied().filter(|v| *v <= threshold).collect();
    if tail.is_empty() {
        None
    } else {
        Some(mean(&tail))
    }
}

pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

fn standard_normal() -> Normal {
    // Parameters are constant and valid.
    Normal::new(0.0, 1.0).unwrap_or_else(|_| unreachable!())
}

pub fn norm_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// Inverse of the standard normal CDF.
pub fn norm_ppf(p: f64) -> f64 {
    standard_normal().inverse_cdf(p)
}
