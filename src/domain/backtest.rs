//! Backtest engine and event loop.
//!
//! For each bar, in date order:
//! 1. Compare the strategy signal with the previous bar's signal
//! 2. A change of +2 (short to long) buys with all cash, -2 sells everything
//! 3. Record equity = cash + shares * close
//!
//! Smaller changes (into or out of neutral) never trade.

use crate::domain::error::QuantError;
use crate::domain::metrics::BacktestMetrics;
use crate::domain::portfolio::{Portfolio, Trade};
use crate::domain::price_series::PriceSeries;
use crate::domain::returns::{CALENDAR_DAYS_PER_YEAR, MIN_PRICE_POINTS};
use crate::domain::strategy::{Signal, StrategyKind};
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const HISTORY_YEARS: i64 = 3;
pub const MAX_REPORTED_TRADES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub strategy: StrategyKind,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            strategy: StrategyKind::moving_average(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), QuantError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(QuantError::domain(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        self.strategy.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPosition {
    pub shares: u64,
    pub value: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub initial_capital: f64,
    pub metrics: BacktestMetrics,
    /// Most recent trades, oldest first.
    pub recent_trades: Vec<Trade>,
    pub current_position: CurrentPosition,
}

pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantError> {
    config.validate()?;
    if series.is_empty() {
        return Err(QuantError::NoData {
            symbol: series.symbol.clone(),
        });
    }
    let points = series.valid_points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(QuantError::InsufficientData {
            symbol: series.symbol.clone(),
            points: 0,
            minimum: MIN_PRICE_POINTS,
        });
    };
    if points.len() < MIN_PRICE_POINTS {
        return Err(QuantError::InsufficientData {
            symbol: series.symbol.clone(),
            points: points.len(),
            minimum: MIN_PRICE_POINTS,
        });
    }

    let signals = config.strategy.signals(&points);
    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut previous: Option<Signal> = None;

    for (point, signal) in points.iter().zip(&signals) {
        if let Some(prev) = previous {
            let change = signal.value() - prev.value();
            if change == 2 {
                if let Some(trade) = portfolio.buy_all(point.date, point.price) {
                    debug!(date = %trade.date, shares = trade.shares, price = trade.price, "buy");
                }
            } else if change == -2 {
                if let Some(trade) = portfolio.sell_all(point.date, point.price) {
                    debug!(date = %trade.date, shares = trade.shares, price = trade.price, "sell");
                }
            }
        }
        portfolio.record_equity(point.date, point.price);
        previous = Some(*signal);
    }

    let metrics = BacktestMetrics::compute(&portfolio, first.price, last.price);
    info!(
        symbol = %series.symbol,
        strategy = %config.strategy,
        trades = metrics.number_of_trades,
        total_return = metrics.total_return,
        "backtest complete"
    );

    let skip = portfolio.trades.len().saturating_sub(MAX_REPORTED_TRADES);
    Ok(BacktestResult {
        symbol: series.symbol.clone(),
        strategy: config.strategy,
        initial_capital: config.initial_capital,
        current_position: CurrentPosition {
            shares: portfolio.shares,
            value: portfolio.holding_value(last.price),
            cash: portfolio.cash,
        },
        recent_trades: portfolio.trades.split_off(skip),
        metrics,
    })
}

/// Backtests the three years of history ending at `as_of`.
pub fn backtest_from_port(
    port: &dyn PriceHistoryPort,
    symbol: &str,
    as_of: NaiveDate,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantError> {
    let start = as_of - Duration::days(HISTORY_YEARS * CALENDAR_DAYS_PER_YEAR as i64);
    let series = port.fetch_prices(symbol, start, as_of)?;
    run_backtest(&series, config)
}
