//! Backtest strategies.
//!
//! Each strategy maps a price history to one stance per bar: long (+1),
//! short/flat (-1) or neutral (0). The backtester only acts on full flips
//! between long and short, see `backtest::run_backtest`.

use crate::domain::error::QuantError;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::price_series::PricePoint;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SHORT_WINDOW: usize = 50;
pub const DEFAULT_LONG_WINDOW: usize = 200;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Long => 1,
            Signal::Short => -1,
            Signal::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Long while the short average is above the long one.
    MovingAverage {
        short_window: usize,
        long_window: usize,
    },
    /// Long below `oversold`, short above `overbought`.
    Rsi {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
}

impl StrategyKind {
    pub fn moving_average() -> Self {
        StrategyKind::MovingAverage {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
        }
    }

    pub fn rsi() -> Self {
        StrategyKind::Rsi {
            period: DEFAULT_RSI_PERIOD,
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::MovingAverage { .. } => "moving_average",
            StrategyKind::Rsi { .. } => "rsi",
        }
    }

    pub fn validate(&self) -> Result<(), QuantError> {
        match *self {
            StrategyKind::MovingAverage {
                short_window,
                long_window,
            } => {
                if short_window == 0 {
                    return Err(QuantError::domain("short window must be at least 1"));
                }
                if short_window >= long_window {
                    return Err(QuantError::domain(format!(
                        "short window ({short_window}) must be less than long window ({long_window})"
                    )));
                }
            }
            StrategyKind::Rsi {
                period,
                oversold,
                overbought,
            } => {
                if period == 0 {
                    return Err(QuantError::domain("RSI period must be at least 1"));
                }
                if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
                    return Err(QuantError::domain(format!(
                        "RSI thresholds must satisfy 0 < oversold ({oversold}) < overbought ({overbought}) < 100"
                    )));
                }
            }
        }
        Ok(())
    }

    /// One signal per input point. Bars still in indicator warmup are neutral.
    pub fn signals(&self, points: &[PricePoint]) -> Vec<Signal> {
        match *self {
            StrategyKind::MovingAverage {
                short_window,
                long_window,
            } => {
                let short = calculate_sma(points, short_window);
                let long = calculate_sma(points, long_window);
                short
                    .values
                    .iter()
                    .zip(&long.values)
                    .map(|(s, l)| match (s.get(), l.get()) {
                        (Some(s), Some(l)) if s > l => Signal::Long,
                        (Some(_), Some(_)) => Signal::Short,
                        _ => Signal::Neutral,
                    })
                    .collect()
            }
            StrategyKind::Rsi {
                period,
                oversold,
                overbought,
            } => calculate_rsi(points, period)
                .values
                .iter()
                .map(|p| match p.get() {
                    Some(v) if v < oversold => Signal::Long,
                    Some(v) if v > overbought => Signal::Short,
                    _ => Signal::Neutral,
                })
                .collect(),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the strategy name and yields its default parameters.
impl FromStr for StrategyKind {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moving_average" | "ma" | "sma" => Ok(Self::moving_average()),
            "rsi" => Ok(Self::rsi()),
            other => Err(QuantError::domain(format!(
                "unknown strategy '{other}' (expected moving_average or rsi)"
            ))),
        }
    }
}
