//! Single-symbol portfolio state for the backtester.
//!
//! Tracks:
//! - Cash balance and whole-share holding
//! - Executed trades (buys and sells)
//! - Equity curve (cash + holding at market, one point per bar)

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: u64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub shares: u64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            shares: 0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Spends cash on as many whole shares as it covers.
    ///
    /// Nothing happens unless cash strictly exceeds the price.
    pub fn buy_all(&mut self, date: NaiveDate, price: f64) -> Option<&Trade> {
        if !(price > 0.0) || self.cash <= price {
            return None;
        }
        let shares = (self.cash / price).floor() as u64;
        let value = shares as f64 * price;
        self.cash -= value;
        self.shares += shares;
        self.trades.push(Trade {
            date,
            side: TradeSide::Buy,
            price,
            shares,
            value,
        });
        self.trades.last()
    }

    /// Liquidates the whole holding, if there is one.
    pub fn sell_all(&mut self, date: NaiveDate, price: f64) -> Option<&Trade> {
        if self.shares == 0 {
            return None;
        }
        let shares = self.shares;
        let value = shares as f64 * price;
        self.cash += value;
        self.shares = 0;
        self.trades.push(Trade {
            date,
            side: TradeSide::Sell,
            price,
            shares,
            value,
        });
        self.trades.last()
    }

    pub fn holding_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.holding_value(price)
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let equity = self.total_equity(price);
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn has_position(&self) -> bool {
        self.shares > 0
    }
}
