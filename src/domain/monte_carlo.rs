//! Monte Carlo price-path simulation.
//!
//! Daily returns are drawn i.i.d. from a normal distribution fitted to the
//! historical return series and compounded from the last observed price.
//! Statistics are computed over terminal values only; a handful of full paths
//! are kept as an illustrative sample.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use crate::domain::returns::{
    CALENDAR_DAYS_PER_YEAR, ReturnSeries, annualize_return, annualize_volatility,
};
use crate::domain::sampling;
use crate::domain::stats;
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand_distr::Distribution;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_INVESTMENT: f64 = 10_000.0;
pub const DEFAULT_HORIZON_DAYS: usize = 252;
pub const DEFAULT_SIMULATIONS: usize = 1_000;
pub const SAMPLE_PATH_COUNT: usize = 5;
pub const TAIL_CONFIDENCE_LEVELS: [f64; 2] = [0.95, 0.99];
/// Calendar years of history used to fit the return distribution.
pub const HISTORY_YEARS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub investment: f64,
    pub horizon_days: usize,
    pub simulations: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            investment: DEFAULT_INVESTMENT,
            horizon_days: DEFAULT_HORIZON_DAYS,
            simulations: DEFAULT_SIMULATIONS,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), QuantError> {
        if !(self.investment.is_finite() && self.investment > 0.0) {
            return Err(QuantError::domain("investment must be positive"));
        }
        if self.horizon_days == 0 {
            return Err(QuantError::domain("simulation horizon must be at least one day"));
        }
        if self.simulations == 0 {
            return Err(QuantError::domain("simulation count must be at least one"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParameters {
    pub symbol: String,
    pub initial_investment: f64,
    pub trading_days: usize,
    pub simulations_run: usize,
    pub last_price: f64,
    /// Annualized mean of the fitted daily returns.
    pub historical_mean_return: f64,
    /// Annualized standard deviation of the fitted daily returns.
    pub historical_volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerminalStatistics {
    pub expected_value: f64,
    pub median_value: f64,
    pub std_deviation: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TailRisk {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
    pub threshold_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeProbabilities {
    pub profit: f64,
    pub loss_over_10pct: f64,
    pub gain_over_20pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloResult {
    pub parameters: SimulationParameters,
    pub statistics: TerminalStatistics,
    pub risk_metrics: Vec<TailRisk>,
    pub probabilities: OutcomeProbabilities,
    /// Full price paths of the first few simulations.
    pub sample_paths: Vec<Vec<f64>>,
}

impl MonteCarloResult {
    pub fn tail_risk(&self, confidence: f64) -> Option<&TailRisk> {
        self.risk_metrics
            .iter()
            .find(|t| (t.confidence - confidence).abs() < 1e-9)
    }
}

/// Runs the simulation on an already fetched price series.
pub fn simulate<R: Rng + ?Sized>(
    series: &PriceSeries,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MonteCarloResult, QuantError> {
    config.validate()?;
    if series.is_empty() {
        return Err(QuantError::NoData {
            symbol: series.symbol.clone(),
        });
    }

    let returns = ReturnSeries::from_prices(series)?;
    let mean = returns.mean();
    let std_dev = returns.std_dev();
    let last_price = series.last_price().ok_or_else(|| QuantError::NoData {
        symbol: series.symbol.clone(),
    })?;

    let dist = sampling::normal(mean, std_dev)?;
    let keep_paths = SAMPLE_PATH_COUNT.min(config.simulations);
    let mut sample_paths = Vec::with_capacity(keep_paths);
    let mut terminal_values = Vec::with_capacity(config.simulations);

    for sim in 0..config.simulations {
        let mut price = last_price;
        let mut path = (sim < keep_paths).then(|| Vec::with_capacity(config.horizon_days));
        for _ in 0..config.horizon_days {
            price *= 1.0 + dist.sample(rng);
            if let Some(path) = path.as_mut() {
                path.push(price);
            }
        }
        if let Some(path) = path {
            sample_paths.push(path);
        }
        terminal_values.push(price / last_price * config.investment);
    }

    debug!(
        symbol = %series.symbol,
        mean,
        std_dev,
        simulations = config.simulations,
        "simulated price paths"
    );

    let result = MonteCarloResult {
        parameters: SimulationParameters {
            symbol: series.symbol.clone(),
            initial_investment: config.investment,
            trading_days: config.horizon_days,
            simulations_run: config.simulations,
            last_price,
            historical_mean_return: annualize_return(mean),
            historical_volatility: annualize_volatility(std_dev),
        },
        statistics: terminal_statistics(&terminal_values),
        risk_metrics: TAIL_CONFIDENCE_LEVELS
            .iter()
            .map(|&c| tail_risk(&terminal_values, config.investment, c))
            .collect(),
        probabilities: outcome_probabilities(&terminal_values, config.investment),
        sample_paths,
    };

    info!(
        symbol = %series.symbol,
        expected_value = result.statistics.expected_value,
        "monte carlo simulation complete"
    );
    Ok(result)
}

/// Fetches two years of history ending `as_of` and simulates.
pub fn simulate_from_port<R: Rng + ?Sized>(
    port: &dyn PriceHistoryPort,
    symbol: &str,
    as_of: NaiveDate,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MonteCarloResult, QuantError> {
    let start = as_of - Duration::days(HISTORY_YEARS * CALENDAR_DAYS_PER_YEAR as i64);
    let series = port.fetch_prices(symbol, start, as_of)?;
    simulate(&series, config, rng)
}

fn terminal_statistics(values: &[f64]) -> TerminalStatistics {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    TerminalStatistics {
        expected_value: stats::mean(values),
        median_value: stats::percentile_sorted(&sorted, 0.5),
        std_deviation: stats::std_dev(values),
        min_value: sorted.first().copied().unwrap_or(0.0),
        max_value: sorted.last().copied().unwrap_or(0.0),
        percentile_25: stats::percentile_sorted(&sorted, 0.25),
        percentile_75: stats::percentile_sorted(&sorted, 0.75),
    }
}

/// VaR/CVaR of terminal values relative to the amount invested.
pub fn tail_risk(values: &[f64], investment: f64, confidence: f64) -> TailRisk {
    let threshold = stats::percentile(values, 1.0 - confidence);
    let cvar = match stats::tail_mean(values, threshold) {
        Some(tail) => investment - tail,
        None => 0.0,
    };
    TailRisk {
        confidence,
        var: investment - threshold,
        cvar,
        threshold_value: threshold,
    }
}

fn fraction(values: &[f64], pred: impl Fn(f64) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| pred(v)).count() as f64 / values.len() as f64
}

fn outcome_probabilities(values: &[f64], investment: f64) -> OutcomeProbabilities {
    OutcomeProbabilities {
        profit: fraction(values, |v| v > investment),
        loss_over_10pct: fraction(values, |v| v < investment * 0.9),
        gain_over_20pct: fraction(values, |v| v > investment * 1.2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_series::PricePoint;
    use crate::domain::sampling::seeded_rng;
    use approx::assert_abs_diff_eq;

    fn make_series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                date: start + Duration::days(i as i64),
                price,
            })
            .collect();
        PriceSeries::new("TEST", points).unwrap()
    }

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + if i % 2 == 0 { 1.5 } else { -1.5 } + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn constant_prices_collapse_to_investment() {
        let series = make_series(&[50.0; 40]);
        let config = SimulationConfig {
            investment: 10_000.0,
            horizon_days: 20,
            simulations: 200,
        };
        let result = simulate(&series, &config, &mut seeded_rng(Some(1))).unwrap();

        assert_abs_diff_eq!(result.statistics.expected_value, 10_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.statistics.std_deviation, 0.0, epsilon = 1e-9);
        let var95 = result.tail_risk(0.95).unwrap();
        assert_abs_diff_eq!(var95.var, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(var95.cvar, 0.0, epsilon = 1e-9);
        assert_eq!(result.probabilities.profit, 0.0);
        assert_eq!(result.parameters.historical_volatility, 0.0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let series = make_series(&zigzag(120));
        let config = SimulationConfig {
            simulations: 50,
            horizon_days: 30,
            ..SimulationConfig::default()
        };
        let a = simulate(&series, &config, &mut seeded_rng(Some(42))).unwrap();
        let b = simulate(&series, &config, &mut seeded_rng(Some(42))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn keeps_only_sample_paths() {
        let series = make_series(&zigzag(60));
        let config = SimulationConfig {
            simulations: 30,
            horizon_days: 10,
            ..SimulationConfig::default()
        };
        let result = simulate(&series, &config, &mut seeded_rng(Some(9))).unwrap();
        assert_eq!(result.sample_paths.len(), SAMPLE_PATH_COUNT);
        assert!(result.sample_paths.iter().all(|p| p.len() == 10));
        assert_eq!(result.parameters.simulations_run, 30);
    }

    #[test]
    fn statistics_are_ordered() {
        let series = make_series(&zigzag(200));
        let config = SimulationConfig {
            simulations: 500,
            horizon_days: 60,
            ..SimulationConfig::default()
        };
        let result = simulate(&series, &config, &mut seeded_rng(Some(5))).unwrap();
        let s = result.statistics;
        assert!(s.min_value <= s.percentile_25);
        assert!(s.percentile_25 <= s.median_value);
        assert!(s.median_value <= s.percentile_75);
        assert!(s.percentile_75 <= s.max_value);

        let v95 = result.tail_risk(0.95).unwrap();
        let v99 = result.tail_risk(0.99).unwrap();
        assert!(v99.var >= v95.var);
        assert!(v95.cvar >= v95.var);
    }

    #[test]
    fn tail_risk_uses_percentile_threshold() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64 * 100.0).collect();
        let risk = tail_risk(&values, 5_000.0, 0.95);
        // 5th percentile of 100..=10000 step 100 is 595
        assert_abs_diff_eq!(risk.threshold_value, 595.0, epsilon = 1e-9);
        assert_abs_diff_eq!(risk.var, 4_405.0, epsilon = 1e-9);
        // values at or below 595 are 100..=500
        assert_abs_diff_eq!(risk.cvar, 5_000.0 - 300.0, epsilon = 1e-9);
    }

    #[test]
    fn probabilities_are_empirical_frequencies() {
        let values = [8_000.0, 9_500.0, 10_000.0, 11_000.0, 13_000.0];
        let p = outcome_probabilities(&values, 10_000.0);
        assert_abs_diff_eq!(p.profit, 0.4);
        assert_abs_diff_eq!(p.loss_over_10pct, 0.2);
        assert_abs_diff_eq!(p.gain_over_20pct, 0.2);
    }

    #[test]
    fn empty_series_is_no_data() {
        let series = PriceSeries::new("EMPTY", vec![]).unwrap();
        let err = simulate(&series, &SimulationConfig::default(), &mut seeded_rng(Some(1)))
            .unwrap_err();
        assert!(matches!(err, QuantError::NoData { .. }));
    }

    #[test]
    fn rejects_zero_simulations() {
        let series = make_series(&zigzag(10));
        let config = SimulationConfig {
            simulations: 0,
            ..SimulationConfig::default()
        };
        let err = simulate(&series, &config, &mut seeded_rng(Some(1))).unwrap_err();
        assert!(matches!(err, QuantError::Domain { .. }));
    }
}
