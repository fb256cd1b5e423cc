//! Engle-Granger cointegration test.
//!
//! Two-step procedure:
//! 1. Cointegrating regression a = alpha + beta * b by OLS
//! 2. Augmented Dickey-Fuller test (no deterministic terms) on the residuals,
//!    lag order chosen by AIC
//!
//! The p-value comes from MacKinnon's response-surface approximation for
//! two variables with a constant.

use crate::domain::error::QuantError;
use crate::domain::stats;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Shortest price history the test accepts.
pub const MIN_OBSERVATIONS: usize = 20;
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

// MacKinnon (2010) surface for N = 2, constant term.
const TAU_MAX: f64 = 0.92;
const TAU_MIN: f64 = -18.86;
const TAU_STAR: f64 = -2.62;
const TAU_SMALL_P: [f64; 3] = [2.92, 1.5012, 0.039796];
const TAU_LARGE_P: [f64; 4] = [2.1945, 0.64695, -0.29198, -0.042377];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CointegrationTest {
    /// ADF t-statistic of the residuals; `-inf` for an exact linear relation.
    pub statistic: f64,
    pub p_value: f64,
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub used_lag: usize,
}

impl CointegrationTest {
    pub fn is_significant(&self) -> bool {
        self.p_value < SIGNIFICANCE_LEVEL
    }
}

#[derive(Debug, Clone)]
struct OlsFit {
    coefficients: DVector<f64>,
    residuals: DVector<f64>,
    ssr: f64,
    /// Diagonal of (X'X)^-1.
    inverse_diag: DVector<f64>,
    nobs: usize,
}

impl OlsFit {
    fn t_value(&self, idx: usize) -> f64 {
        let dof = self.nobs - self.coefficients.len();
        let sigma2 = self.ssr / dof as f64;
        self.coefficients[idx] / (sigma2 * self.inverse_diag[idx]).sqrt()
    }

    /// Gaussian AIC with every regressor counted as a parameter.
    fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.coefficients.len() as f64
    }
}

/// OLS via the normal equations, `None` when X'X is singular.
fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    if x.nrows() <= x.ncols() {
        return None;
    }
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    let coefficients = &xtx_inv * (&xt * y);
    let residuals = y - x * &coefficients;
    let ssr = residuals.dot(&residuals);
    Some(OlsFit {
        inverse_diag: xtx_inv.diagonal(),
        coefficients,
        residuals,
        ssr,
        nobs: x.nrows(),
    })
}

/// Lagged ADF design on rows `start..dx.len()`: response `dx[t]`,
/// regressors `[x[t], dx[t-1], ..., dx[t-lags]]`.
fn adf_design(x: &[f64], dx: &[f64], start: usize, lags: usize) -> (DMatrix<f64>, DVector<f64>) {
    let rows = dx.len() - start;
    let design = DMatrix::from_fn(rows, lags + 1, |r, c| {
        let t = start + r;
        if c == 0 { x[t] } else { dx[t - c] }
    });
    let response = DVector::from_iterator(rows, dx[start..].iter().copied());
    (design, response)
}

/// ADF statistic with no constant or trend, and the lag order used.
pub fn adf_no_constant(x: &[f64]) -> Option<(f64, usize)> {
    let nobs = x.len();
    let schwert = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = schwert.min((nobs / 2).checked_sub(1)?);
    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    if dx.len() <= max_lag + 1 {
        return None;
    }

    // Lag search runs every candidate on the sample of the longest one.
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let (design, response) = adf_design(x, &dx, max_lag, lags);
        let Some(fit) = ols(&design, &response) else {
            continue;
        };
        let aic = fit.aic();
        if best.is_none_or(|(best_aic, _)| aic < best_aic) {
            best = Some((aic, lags));
        }
    }
    let (_, used_lag) = best?;

    let (design, response) = adf_design(x, &dx, used_lag, used_lag);
    let fit = ols(&design, &response)?;
    Some((fit.t_value(0), used_lag))
}

/// MacKinnon approximate p-value of an Engle-Granger statistic (two series).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let poly = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    stats::norm_cdf(poly)
}

/// Coefficients in ascending power order.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Engle-Granger test of `a` on `b`.
pub fn engle_granger(symbol: &str, a: &[f64], b: &[f64]) -> Result<CointegrationTest, QuantError> {
    let n = a.len().min(b.len());
    if n < MIN_OBSERVATIONS {
        return Err(QuantError::InsufficientData {
            symbol: symbol.to_string(),
            points: n,
            minimum: MIN_OBSERVATIONS,
        });
    }
    let (a, b) = (&a[..n], &b[..n]);
    if stats::std_dev(a) == 0.0 || stats::std_dev(b) == 0.0 {
        return Err(QuantError::domain(format!(
            "{symbol}: cannot test cointegration of a constant series"
        )));
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { b[i] });
    let response = DVector::from_column_slice(a);
    let fit = ols(&design, &response)
        .ok_or_else(|| QuantError::domain(format!("{symbol}: singular cointegrating regression")))?;

    let centered_tss: f64 = {
        let m = stats::mean(a);
        a.iter().map(|v| (v - m).powi(2)).sum()
    };
    let r_squared = 1.0 - fit.ssr / centered_tss;
    let intercept = fit.coefficients[0];
    let hedge_ratio = fit.coefficients[1];

    // Exact linear relation: residuals carry no information, treat as perfectly cointegrated.
    if r_squared >= 1.0 - 100.0 * f64::EPSILON.sqrt() {
        return Ok(CointegrationTest {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            hedge_ratio,
            intercept,
            used_lag: 0,
        });
    }

    let residuals: Vec<f64> = fit.residuals.iter().copied().collect();
    let (statistic, used_lag) = adf_no_constant(&residuals)
        .ok_or_else(|| QuantError::domain(format!("{symbol}: ADF regression is singular")))?;

    Ok(CointegrationTest {
        statistic,
        p_value: mackinnon_p_value(statistic),
        hedge_ratio,
        intercept,
        used_lag,
    })
}
