//! Value-at-Risk and Conditional VaR for an equal-weighted portfolio.
//!
//! Three estimators run side by side on the same portfolio return series:
//! historical percentiles, a parametric normal model and a simulation from
//! the fitted normal. Losses are reported as positive currency amounts.

use crate::domain::error::QuantError;
use crate::domain::returns::{
    CALENDAR_DAYS_PER_YEAR, annualize_return, annualize_volatility, holding_period_factor,
};
use crate::domain::sampling;
use crate::domain::stats;
use crate::domain::universe::{self, AlignedPrices, SkippedSymbol};
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

pub const DEFAULT_PORTFOLIO_VALUE: f64 = 100_000.0;
pub const DEFAULT_HOLDING_PERIOD: u32 = 10;
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];
pub const DEFAULT_SIMULATIONS: usize = 10_000;
/// Minimum aligned price rows for an estimate.
pub const MIN_PRICE_ROWS: usize = 30;
pub const HISTORY_YEARS: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct VarConfig {
    pub portfolio_value: f64,
    pub holding_period: u32,
    pub confidence_levels: Vec<f64>,
    pub simulations: usize,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            portfolio_value: DEFAULT_PORTFOLIO_VALUE,
            holding_period: DEFAULT_HOLDING_PERIOD,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            simulations: DEFAULT_SIMULATIONS,
        }
    }
}

impl VarConfig {
    fn validate(&self) -> Result<(), QuantError> {
        if !(self.portfolio_value.is_finite() && self.portfolio_value > 0.0) {
            return Err(QuantError::domain("portfolio value must be positive"));
        }
        if self.holding_period == 0 {
            return Err(QuantError::domain("holding period must be at least one day"));
        }
        if self.confidence_levels.is_empty() {
            return Err(QuantError::domain("at least one confidence level is required"));
        }
        if let Some(bad) = self
            .confidence_levels
            .iter()
            .find(|c| !(c.is_finite() && **c > 0.0 && **c < 1.0))
        {
            return Err(QuantError::domain(format!(
                "confidence level {bad} is outside (0, 1)"
            )));
        }
        if self.simulations == 0 {
            return Err(QuantError::domain("simulation count must be at least one"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Historical,
    Parametric,
    Simulation,
}

impl VarMethod {
    pub const ALL: [VarMethod; 3] = [
        VarMethod::Historical,
        VarMethod::Parametric,
        VarMethod::Simulation,
    ];

    /// VaR/CVaR at each configured confidence level.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        portfolio_returns: &[f64],
        config: &VarConfig,
        rng: &mut R,
    ) -> Result<Vec<ConfidenceEstimate>, QuantError> {
        let h = config.holding_period;
        let value = config.portfolio_value;
        let estimates = match self {
            VarMethod::Historical => {
                let factor = holding_period_factor(h);
                let scaled: Vec<f64> = portfolio_returns.iter().map(|r| r * factor).collect();
                empirical_estimates(&scaled, &config.confidence_levels, value)
            }
            VarMethod::Parametric => {
                let sigma = stats::std_dev(portfolio_returns) * holding_period_factor(h);
                config
                    .confidence_levels
                    .iter()
                    .map(|&confidence| parametric_estimate(sigma, confidence, value))
                    .collect()
            }
            VarMethod::Simulation => {
                let mean = stats::mean(portfolio_returns) * f64::from(h);
                let sigma = stats::std_dev(portfolio_returns) * holding_period_factor(h);
                let draws = sampling::normal_draws(rng, mean, sigma, config.simulations)?;
                empirical_estimates(&draws, &config.confidence_levels, value)
            }
        };
        Ok(estimates)
    }
}

impl fmt::Display for VarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarMethod::Historical => write!(f, "historical"),
            VarMethod::Parametric => write!(f, "parametric"),
            VarMethod::Simulation => write!(f, "simulation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceEstimate {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodEstimates {
    pub method: VarMethod,
    pub estimates: Vec<ConfidenceEstimate>,
}

impl MethodEstimates {
    pub fn at(&self, confidence: f64) -> Option<&ConfidenceEstimate> {
        self.estimates
            .iter()
            .find(|e| (e.confidence - confidence).abs() < 1e-9)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioComposition {
    pub symbols: Vec<String>,
    pub weights: Vec<f64>,
    pub portfolio_value: f64,
    pub holding_period_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskContribution {
    pub symbol: String,
    pub weight: f64,
    pub volatility: f64,
    pub percentage_of_risk: f64,
}

/// Portfolio-level statistics; rates are fractions, not percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub downside_deviation: f64,
    pub max_drawdown: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Score bands: volatility (0-3), Sharpe (0-2), drawdown (0-3).
    pub fn score(annual_volatility: f64, sharpe: f64, max_drawdown: f64) -> u32 {
        let vol_score = match annual_volatility {
            v if v > 0.40 => 3,
            v if v > 0.25 => 2,
            v if v > 0.15 => 1,
            _ => 0,
        };
        let sharpe_score = match sharpe {
            s if s < 0.5 => 2,
            s if s < 1.0 => 1,
            _ => 0,
        };
        let dd_score = match max_drawdown {
            d if d > 0.30 => 3,
            d if d > 0.20 => 2,
            d if d > 0.10 => 1,
            _ => 0,
        };
        vol_score + sharpe_score + dd_score
    }

    pub fn classify(annual_volatility: f64, sharpe: f64, max_drawdown: f64) -> Self {
        match Self::score(annual_volatility, sharpe, max_drawdown) {
            s if s >= 6 => RiskLevel::High,
            s if s >= 3 => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub data_points: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarReport {
    pub composition: PortfolioComposition,
    pub methods: Vec<MethodEstimates>,
    pub risk_contributions: Vec<RiskContribution>,
    pub metrics: PortfolioMetrics,
    pub risk_level: RiskLevel,
    pub data_quality: DataQuality,
    pub skipped: Vec<SkippedSymbol>,
}

impl VarReport {
    pub fn method(&self, method: VarMethod) -> Option<&MethodEstimates> {
        self.methods.iter().find(|m| m.method == method)
    }
}

/// Loss at a percentile threshold, floored at zero.
fn loss_amount(fractional_return: f64, value: f64) -> f64 {
    (-fractional_return).max(0.0) * value
}

fn empirical_estimates(
    returns: &[f64],
    confidence_levels: &[f64],
    value: f64,
) -> Vec<ConfidenceEstimate> {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    confidence_levels
        .iter()
        .map(|&confidence| {
            let threshold = stats::percentile_sorted(&sorted, 1.0 - confidence);
            let var = loss_amount(threshold, value);
            let cvar = stats::tail_mean(&sorted, threshold)
                .map(|tail| loss_amount(tail, value))
                .unwrap_or(var);
            ConfidenceEstimate {
                confidence,
                var,
                cvar,
            }
        })
        .collect()
}

fn parametric_estimate(sigma: f64, confidence: f64, value: f64) -> ConfidenceEstimate {
    let z = stats::norm_ppf(1.0 - confidence);
    let shortfall_multiplier = stats::norm_pdf(z) / (1.0 - confidence);
    ConfidenceEstimate {
        confidence,
        var: (z * sigma * value).abs(),
        cvar: (sigma * shortfall_multiplier * value).abs(),
    }
}

/// Annualized statistics of a daily return series.
pub fn portfolio_metrics(returns: &[f64]) -> PortfolioMetrics {
    let annual_return = annualize_return(stats::mean(returns));
    let annual_volatility = annualize_volatility(stats::std_dev(returns));
    let sharpe_ratio = if annual_volatility > 0.0 {
        annual_return / annual_volatility
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_deviation = if downside.is_empty() {
        0.0
    } else {
        annualize_volatility(stats::std_dev(&downside))
    };

    PortfolioMetrics {
        annual_return,
        annual_volatility,
        sharpe_ratio,
        downside_deviation,
        max_drawdown: stats::max_drawdown(&stats::cumulative_curve(returns)),
        skewness: stats::skewness(returns),
        kurtosis: stats::kurtosis(returns),
    }
}

fn risk_contributions(
    symbols: &[String],
    weight: f64,
    symbol_returns: &[Vec<f64>],
    portfolio_volatility: f64,
) -> Vec<RiskContribution> {
    symbols
        .iter()
        .zip(symbol_returns)
        .map(|(symbol, returns)| {
            let volatility = annualize_volatility(stats::std_dev(returns));
            let percentage_of_risk = if portfolio_volatility > 0.0 {
                weight * volatility / portfolio_volatility * 100.0
            } else {
                0.0
            };
            RiskContribution {
                symbol: symbol.clone(),
                weight,
                volatility,
                percentage_of_risk,
            }
        })
        .collect()
}

/// Equal-weighted daily portfolio returns over aligned rows.
pub fn equal_weighted_returns(symbol_returns: &[Vec<f64>]) -> Vec<f64> {
    let n = symbol_returns.len();
    let Some(len) = symbol_returns.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    let weight = 1.0 / n as f64;
    (0..len)
        .map(|t| symbol_returns.iter().map(|r| r[t] * weight).sum())
        .collect()
}

/// Runs every estimator on an aligned price frame.
pub fn compute_var<R: Rng + ?Sized>(
    prices: &AlignedPrices,
    config: &VarConfig,
    rng: &mut R,
) -> Result<VarReport, QuantError> {
    config.validate()?;
    if prices.symbol_count() == 0 {
        return Err(QuantError::domain("symbol list is empty"));
    }
    if prices.len() < MIN_PRICE_ROWS {
        return Err(QuantError::InsufficientData {
            symbol: prices.symbols.join(","),
            points: prices.len(),
            minimum: MIN_PRICE_ROWS,
        });
    }

    let symbol_returns = prices.returns();
    let portfolio_returns = equal_weighted_returns(&symbol_returns);
    let weight = 1.0 / prices.symbol_count() as f64;

    let mut methods = Vec::with_capacity(VarMethod::ALL.len());
    for method in VarMethod::ALL {
        let estimates = method.estimate(&portfolio_returns, config, rng)?;
        debug!(method = %method, levels = estimates.len(), "var estimated");
        methods.push(MethodEstimates { method, estimates });
    }

    let metrics = portfolio_metrics(&portfolio_returns);
    let return_dates = &prices.dates[1..];

    Ok(VarReport {
        composition: PortfolioComposition {
            symbols: prices.symbols.clone(),
            weights: vec![weight; prices.symbol_count()],
            portfolio_value: config.portfolio_value,
            holding_period_days: config.holding_period,
        },
        methods,
        risk_contributions: risk_contributions(
            &prices.symbols,
            weight,
            &symbol_returns,
            metrics.annual_volatility,
        ),
        risk_level: RiskLevel::classify(
            metrics.annual_volatility,
            metrics.sharpe_ratio,
            metrics.max_drawdown,
        ),
        metrics,
        data_quality: DataQuality {
            data_points: portfolio_returns.len(),
            start_date: return_dates.first().copied(),
            end_date: return_dates.last().copied(),
        },
        skipped: Vec::new(),
    })
}

/// Loads two years of history for `symbols` ending `as_of` and estimates VaR.
pub fn calculate_var<R: Rng + ?Sized>(
    port: &dyn PriceHistoryPort,
    symbols: &[String],
    as_of: NaiveDate,
    config: &VarConfig,
    rng: &mut R,
) -> Result<VarReport, QuantError> {
    if symbols.is_empty() {
        return Err(QuantError::domain("symbol list is empty"));
    }
    let start = as_of - Duration::days(HISTORY_YEARS * CALENDAR_DAYS_PER_YEAR as i64);
    let load = universe::load_aligned(port, symbols, start, as_of);
    if load.prices.symbol_count() == 0 {
        return Err(QuantError::NoData {
            symbol: symbols.join(","),
        });
    }

    let mut report = compute_var(&load.prices, config, rng)?;
    report.skipped = load.skipped;
    info!(
        symbols = %report.composition.symbols.join(","),
        risk_level = ?report.risk_level,
        "var calculation complete"
    );
    Ok(report)
}
