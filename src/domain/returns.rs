//! Return series builder and the engine-wide annualization conventions.
//!
//! Simple returns `r_t = p_t / p_{t-1} - 1` over the valid prices of a series.
//! Annualized return is `mean * 252`, annualized volatility `std * sqrt(252)`,
//! and holding-period scaling multiplies by `sqrt(days)`.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use crate::domain::stats;
use chrono::NaiveDate;
use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub symbol: String,
    /// Date each return ends on.
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    /// Builds simple returns, dropping NaN / non-positive prices first.
    pub fn from_prices(series: &PriceSeries) -> Result<Self, QuantError> {
        let valid = series.valid_points();
        if valid.len() < MIN_PRICE_POINTS {
            return Err(QuantError::InsufficientData {
                symbol: series.symbol.clone(),
                points: valid.len(),
                minimum: MIN_PRICE_POINTS,
            });
        }

        let (dates, values): (Vec<NaiveDate>, Vec<f64>) = valid
            .windows(2)
            .map(|w| (w[1].date, w[1].price / w[0].price - 1.0))
            .unzip();

        Ok(Self {
            symbol: series.symbol.clone(),
            dates,
            values,
        })
    }

    /// Returns of a raw price slice, for callers that already hold aligned prices.
    pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
        prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.values)
    }

    pub fn std_dev(&self) -> f64 {
        stats::std_dev(&self.values)
    }

    pub fn annualized_return(&self) -> f64 {
        annualize_return(self.mean())
    }

    pub fn annualized_volatility(&self) -> f64 {
        annualize_volatility(self.std_dev())
    }

    /// Each return multiplied by `sqrt(holding_period)`.
    pub fn scaled_to_holding_period(&self, holding_period: u32) -> Vec<f64> {
        let factor = holding_period_factor(holding_period);
        self.values.iter().map(|r| r * factor).collect()
    }
}

pub fn annualize_return(daily_mean: f64) -> f64 {
    daily_mean * TRADING_DAYS_PER_YEAR
}

pub fn annualize_volatility(daily_std: f64) -> f64 {
    daily_std * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn holding_period_factor(holding_period: u32) -> f64 {
    f64::from(holding_period).sqrt()
}
