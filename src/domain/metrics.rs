//! Backtest performance metrics.

use super::portfolio::{EquityPoint, Portfolio};
use crate::domain::returns::TRADING_DAYS_PER_YEAR;
use crate::domain::stats;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub final_value: f64,
    pub sharpe_ratio: f64,
    /// Positive fraction of the peak.
    pub max_drawdown: f64,
    pub number_of_trades: usize,
    pub buy_hold_return: f64,
    pub alpha: f64,
}

impl BacktestMetrics {
    /// `first_price` / `last_price` are the closes the buy-and-hold benchmark uses.
    pub fn compute(portfolio: &Portfolio, first_price: f64, last_price: f64) -> Self {
        let initial_capital = portfolio.initial_capital;
        let final_value = portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let buy_hold_return = if first_price > 0.0 {
            (last_price - first_price) / first_price
        } else {
            0.0
        };

        let returns = daily_returns(&portfolio.equity_curve);

        BacktestMetrics {
            total_return,
            final_value,
            sharpe_ratio: compute_sharpe(&returns),
            max_drawdown: compute_drawdown(&returns),
            number_of_trades: portfolio.trades.len(),
            buy_hold_return,
            alpha: total_return - buy_hold_return,
        }
    }
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Drawdown of the growth index built from the daily returns.
fn compute_drawdown(returns: &[f64]) -> f64 {
    stats::max_drawdown(&stats::cumulative_curve(returns))
}

/// Annualized mean/std of daily returns, no risk-free adjustment.
/// A flat curve has no defined ratio and reports 0.
fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let stddev = stats::std_dev(returns);
    if stddev > 0.0 {
        stats::mean(returns) / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
