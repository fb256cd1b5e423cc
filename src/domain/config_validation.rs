//! Configuration validation.
//!
//! Reads each INI section through `ConfigPort`, applies defaults and range
//! checks, and produces the typed engine configs. Every failure names the
//! offending `[section] key`.

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL};
use crate::domain::error::QuantError;
use crate::domain::monte_carlo::{
    DEFAULT_HORIZON_DAYS, DEFAULT_INVESTMENT, DEFAULT_SIMULATIONS, SimulationConfig,
};
use crate::domain::projection::DEFAULT_ANNUAL_VOLATILITY;
use crate::domain::risk_assessment::{DEFAULT_BENCHMARK, DEFAULT_RISK_FREE_RATE};
use crate::domain::strategy::{
    DEFAULT_LONG_WINDOW, DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD, DEFAULT_RSI_PERIOD,
    DEFAULT_SHORT_WINDOW, StrategyKind,
};
use crate::domain::var::{
    DEFAULT_CONFIDENCE_LEVELS, DEFAULT_HOLDING_PERIOD, DEFAULT_PORTFOLIO_VALUE,
    DEFAULT_SIMULATIONS as DEFAULT_VAR_SIMULATIONS, VarConfig,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_OPTIONS_RISK_FREE_RATE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSettings {
    pub benchmark: String,
    pub risk_free_rate: f64,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantError {
    QuantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn load_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, QuantError> {
    let path = match config.get_string("data", "path") {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
        _ => {
            return Err(QuantError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            });
        }
    };

    let start_date = parse_date(config, "data", "start_date")?;
    let end_date = parse_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }

    Ok(DataSettings {
        path,
        start_date,
        end_date,
    })
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, QuantError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
            }),
    }
}

fn parse_seed(config: &dyn ConfigPort, section: &str) -> Result<Option<u64>, QuantError> {
    match config.get_string(section, "seed") {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(section, "seed", "seed must be a non-negative integer")),
    }
}

fn rate_in_unit_range(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, QuantError> {
    let value = config.get_double(section, key, default);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(section, key, format!("{key} must be between 0 and 1")));
    }
    Ok(value)
}

fn positive_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, QuantError> {
    let value = config.get_int(section, key, default as i64);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    usize::try_from(value).map_err(|_| invalid(section, key, format!("{key} is too large")))
}

fn positive_amount(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, QuantError> {
    let value = config.get_double(section, key, default);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

pub fn load_options_rate(config: &dyn ConfigPort) -> Result<f64, QuantError> {
    rate_in_unit_range(config, "options", "risk_free_rate", DEFAULT_OPTIONS_RISK_FREE_RATE)
}

/// Monte Carlo settings plus the optional RNG seed.
pub fn load_monte_carlo_config(
    config: &dyn ConfigPort,
) -> Result<(SimulationConfig, Option<u64>), QuantError> {
    let settings = SimulationConfig {
        investment: positive_amount(config, "monte_carlo", "investment", DEFAULT_INVESTMENT)?,
        horizon_days: positive_count(config, "monte_carlo", "days", DEFAULT_HORIZON_DAYS)?,
        simulations: positive_count(config, "monte_carlo", "simulations", DEFAULT_SIMULATIONS)?,
    };
    Ok((settings, parse_seed(config, "monte_carlo")?))
}

/// VaR settings plus the optional RNG seed.
pub fn load_var_config(config: &dyn ConfigPort) -> Result<(VarConfig, Option<u64>), QuantError> {
    let holding_period =
        positive_count(config, "var", "holding_period", DEFAULT_HOLDING_PERIOD as usize)?;
    let holding_period = u32::try_from(holding_period)
        .map_err(|_| invalid("var", "holding_period", "holding_period is too large"))?;

    let confidence_levels = match config.get_list("var", "confidence_levels") {
        None => DEFAULT_CONFIDENCE_LEVELS.to_vec(),
        Some(items) => {
            let mut levels = Vec::with_capacity(items.len());
            for item in &items {
                let level: f64 = item.parse().map_err(|_| {
                    invalid("var", "confidence_levels", format!("'{item}' is not a number"))
                })?;
                if !(level > 0.0 && level < 1.0) {
                    return Err(invalid(
                        "var",
                        "confidence_levels",
                        format!("confidence level {level} must be strictly between 0 and 1"),
                    ));
                }
                levels.push(level);
            }
            if levels.is_empty() {
                return Err(invalid("var", "confidence_levels", "at least one level is required"));
            }
            levels
        }
    };

    let settings = VarConfig {
        portfolio_value: positive_amount(
            config,
            "var",
            "portfolio_value",
            DEFAULT_PORTFOLIO_VALUE,
        )?,
        holding_period,
        confidence_levels,
        simulations: positive_count(config, "var", "simulations", DEFAULT_VAR_SIMULATIONS)?,
    };
    Ok((settings, parse_seed(config, "var")?))
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, QuantError> {
    let initial_capital =
        positive_amount(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;

    let name = config
        .get_string("backtest", "strategy")
        .unwrap_or_else(|| "moving_average".to_string());
    let strategy = match name
        .parse::<StrategyKind>()
        .map_err(|e| invalid("backtest", "strategy", e.to_string()))?
    {
        StrategyKind::MovingAverage { .. } => {
            let short_window =
                positive_count(config, "backtest", "short_window", DEFAULT_SHORT_WINDOW)?;
            let long_window =
                positive_count(config, "backtest", "long_window", DEFAULT_LONG_WINDOW)?;
            if short_window >= long_window {
                return Err(invalid(
                    "backtest",
                    "short_window",
                    "short_window must be less than long_window",
                ));
            }
            StrategyKind::MovingAverage {
                short_window,
                long_window,
            }
        }
        StrategyKind::Rsi { .. } => {
            let period = positive_count(config, "backtest", "rsi_period", DEFAULT_RSI_PERIOD)?;
            let oversold = config.get_double("backtest", "oversold", DEFAULT_OVERSOLD);
            let overbought = config.get_double("backtest", "overbought", DEFAULT_OVERBOUGHT);
            if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
                return Err(invalid(
                    "backtest",
                    "oversold",
                    "thresholds must satisfy 0 < oversold < overbought < 100",
                ));
            }
            StrategyKind::Rsi {
                period,
                oversold,
                overbought,
            }
        }
    };

    Ok(BacktestConfig {
        initial_capital,
        strategy,
    })
}

pub fn load_projection_volatility(config: &dyn ConfigPort) -> Result<f64, QuantError> {
    let value = config.get_double("projection", "annual_volatility", DEFAULT_ANNUAL_VOLATILITY);
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid(
            "projection",
            "annual_volatility",
            "annual_volatility must be non-negative",
        ));
    }
    Ok(value)
}

pub fn load_risk_settings(config: &dyn ConfigPort) -> Result<RiskSettings, QuantError> {
    let benchmark = match config.get_string("risk", "benchmark") {
        Some(b) if !b.trim().is_empty() => b.trim().to_uppercase(),
        Some(_) => return Err(invalid("risk", "benchmark", "benchmark must not be empty")),
        None => DEFAULT_BENCHMARK.to_string(),
    };
    Ok(RiskSettings {
        benchmark,
        risk_free_rate: rate_in_unit_range(
            config,
            "risk",
            "risk_free_rate",
            DEFAULT_RISK_FREE_RATE,
        )?,
    })
}
