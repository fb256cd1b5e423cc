//! Single-symbol risk profile against a benchmark.
//!
//! Both histories are aligned on common dates before returns are taken, so
//! beta compares like-for-like days.

use crate::domain::error::QuantError;
use crate::domain::returns::{
    CALENDAR_DAYS_PER_YEAR, MIN_PRICE_POINTS, TRADING_DAYS_PER_YEAR, annualize_volatility,
};
use crate::domain::stats;
use crate::domain::universe::AlignedPrices;
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::info;

pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const VAR_CONFIDENCE: f64 = 0.95;
pub const HISTORY_YEARS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub symbol: String,
    pub benchmark: String,
    pub observations: usize,
    pub beta: f64,
    pub sharpe_ratio: f64,
    /// 5th percentile of daily returns; negative for a loss.
    pub value_at_risk_95: f64,
    /// Peak minus trough of the growth index.
    pub max_drawdown: f64,
    pub volatility: f64,
}

/// Risk metrics from aligned daily returns of a symbol and its benchmark.
pub fn assess_returns(
    symbol: &str,
    benchmark: &str,
    returns: &[f64],
    benchmark_returns: &[f64],
    risk_free_rate: f64,
) -> Result<RiskAssessment, QuantError> {
    if returns.len() != benchmark_returns.len() {
        return Err(QuantError::domain(format!(
            "{symbol} and {benchmark} returns are not aligned ({} vs {})",
            returns.len(),
            benchmark_returns.len()
        )));
    }
    if returns.len() < MIN_PRICE_POINTS {
        return Err(QuantError::InsufficientData {
            symbol: symbol.to_string(),
            points: returns.len() + 1,
            minimum: MIN_PRICE_POINTS + 1,
        });
    }

    let benchmark_variance = stats::std_dev(benchmark_returns).powi(2);
    let beta = if benchmark_variance > 0.0 {
        stats::covariance(returns, benchmark_returns) / benchmark_variance
    } else {
        0.0
    };

    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let daily_std = stats::std_dev(returns);
    let sharpe_ratio = if daily_std > 0.0 {
        (stats::mean(returns) - daily_rf) / daily_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let growth = stats::cumulative_curve(returns);
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;
    for &level in &growth {
        peak = peak.max(level);
        max_drawdown = max_drawdown.max(peak - level);
    }

    Ok(RiskAssessment {
        symbol: symbol.to_string(),
        benchmark: benchmark.to_string(),
        observations: returns.len(),
        beta,
        sharpe_ratio,
        value_at_risk_95: stats::percentile(returns, 1.0 - VAR_CONFIDENCE),
        max_drawdown,
        volatility: annualize_volatility(daily_std),
    })
}

/// Five years of history for `symbol` and `benchmark`, ending at `as_of`.
pub fn assess_risk(
    port: &dyn PriceHistoryPort,
    symbol: &str,
    benchmark: &str,
    as_of: NaiveDate,
    risk_free_rate: f64,
) -> Result<RiskAssessment, QuantError> {
    let start = as_of - Duration::days(HISTORY_YEARS * CALENDAR_DAYS_PER_YEAR as i64);
    let mut fetched = Vec::with_capacity(2);
    for name in [symbol, benchmark] {
        let series = port.fetch_prices(name, start, as_of)?;
        if series.is_empty() {
            return Err(QuantError::NoData {
                symbol: name.to_string(),
            });
        }
        let points = series.points().iter().map(|p| (p.date, p.price)).collect();
        fetched.push((name.to_string(), points));
    }

    let aligned = AlignedPrices::align(fetched);
    let columns = aligned.returns();
    let (Some(returns), Some(benchmark_returns)) = (columns.first(), columns.get(1)) else {
        return Err(QuantError::NoData {
            symbol: symbol.to_string(),
        });
    };
    let assessment = assess_returns(symbol, benchmark, returns, benchmark_returns, risk_free_rate)?;
    info!(
        symbol = %symbol,
        benchmark = %benchmark,
        beta = assessment.beta,
        sharpe = assessment.sharpe_ratio,
        "risk assessment complete"
    );
    Ok(assessment)
}
