//! Black-Scholes option valuation and Greeks.
//!
//! `T = days / 365`, volatility is the annualized standard deviation of the
//! trailing one-year return series. Greeks are reported in trader units:
//! theta per calendar day, vega per 1 vol point, rho per 1 rate point.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use crate::domain::returns::{CALENDAR_DAYS_PER_YEAR, ReturnSeries, TRADING_DAYS_PER_YEAR};
use crate::domain::stats::{norm_cdf, norm_pdf};
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;
/// Relative band around the strike treated as at-the-money.
pub const MONEYNESS_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

impl FromStr for OptionKind {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionKind::Call),
            "put" | "p" => Ok(OptionKind::Put),
            other => Err(QuantError::domain(format!("unknown option kind '{other}'"))),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "CALL"),
            OptionKind::Put => write!(f, "PUT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Moneyness {
    #[serde(rename = "ITM")]
    InTheMoney,
    #[serde(rename = "ATM")]
    AtTheMoney,
    #[serde(rename = "OTM")]
    OutOfTheMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

/// Upside of a long option position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxGain {
    Unlimited,
    Capped(f64),
}

impl MaxGain {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, MaxGain::Unlimited)
    }
}

impl Serialize for MaxGain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaxGain::Unlimited => serializer.serialize_str("Unlimited"),
            MaxGain::Capped(value) => serializer.serialize_f64(*value),
        }
    }
}

/// Validated Black-Scholes parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesInputs {
    pub spot: f64,
    pub strike: f64,
    pub time_years: f64,
    pub rate: f64,
    pub volatility: f64,
}

impl BlackScholesInputs {
    pub fn new(
        spot: f64,
        strike: f64,
        time_years: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, QuantError> {
        if !(volatility.is_finite() && volatility > 0.0) {
            return Err(QuantError::domain(format!(
                "volatility must be positive, got {volatility}"
            )));
        }
        if !(time_years.is_finite() && time_years > 0.0) {
            return Err(QuantError::domain(format!(
                "time to expiry must be positive, got {time_years}"
            )));
        }
        if !(spot.is_finite() && spot > 0.0) || !(strike.is_finite() && strike > 0.0) {
            return Err(QuantError::domain("spot and strike must be positive"));
        }
        if !rate.is_finite() {
            return Err(QuantError::domain("risk-free rate must be finite"));
        }
        Ok(Self {
            spot,
            strike,
            time_years,
            rate,
            volatility,
        })
    }

    /// Inputs for an expiry quoted in calendar days.
    pub fn from_days(
        spot: f64,
        strike: f64,
        days_to_expiry: u32,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, QuantError> {
        let time_years = f64::from(days_to_expiry) / CALENDAR_DAYS_PER_YEAR;
        Self::new(spot, strike, time_years, rate, volatility)
    }

    fn vol_sqrt_t(&self) -> f64 {
        self.volatility * self.time_years.sqrt()
    }

    pub fn d1(&self) -> f64 {
        ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility * self.volatility) * self.time_years)
            / self.vol_sqrt_t()
    }

    pub fn d2(&self) -> f64 {
        self.d1() - self.vol_sqrt_t()
    }

    fn discounted_strike(&self) -> f64 {
        self.strike * (-self.rate * self.time_years).exp()
    }
}

impl OptionKind {
    pub fn price(&self, inputs: &BlackScholesInputs) -> f64 {
        let d1 = inputs.d1();
        let d2 = inputs.d2();
        match self {
            OptionKind::Call => {
                inputs.spot * norm_cdf(d1) - inputs.discounted_strike() * norm_cdf(d2)
            }
            OptionKind::Put => {
                inputs.discounted_strike() * norm_cdf(-d2) - inputs.spot * norm_cdf(-d1)
            }
        }
    }

    pub fn greeks(&self, inputs: &BlackScholesInputs) -> Greeks {
        let d1 = inputs.d1();
        let d2 = inputs.d2();
        let sqrt_t = inputs.time_years.sqrt();
        let pdf_d1 = norm_pdf(d1);
        let decay = -(inputs.spot * pdf_d1 * inputs.volatility) / (2.0 * sqrt_t);
        let carry = inputs.rate * inputs.discounted_strike();

        let gamma = pdf_d1 / (inputs.spot * inputs.vol_sqrt_t());
        let vega = inputs.spot * pdf_d1 * sqrt_t / 100.0;

        let (delta, theta, rho) = match self {
            OptionKind::Call => (
                norm_cdf(d1),
                (decay - carry * norm_cdf(d2)) / CALENDAR_DAYS_PER_YEAR,
                inputs.discounted_strike() * inputs.time_years * norm_cdf(d2) / 100.0,
            ),
            OptionKind::Put => (
                -norm_cdf(-d1),
                (decay + carry * norm_cdf(-d2)) / CALENDAR_DAYS_PER_YEAR,
                -inputs.discounted_strike() * inputs.time_years * norm_cdf(-d2) / 100.0,
            ),
        };

        Greeks {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }

    /// Risk-neutral probability of expiring in the money.
    pub fn probability_itm(&self, inputs: &BlackScholesInputs) -> f64 {
        match self {
            OptionKind::Call => norm_cdf(inputs.d2()),
            OptionKind::Put => norm_cdf(-inputs.d2()),
        }
    }

    pub fn intrinsic_value(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (spot - strike).max(0.0),
            OptionKind::Put => (strike - spot).max(0.0),
        }
    }

    pub fn moneyness(&self, spot: f64, strike: f64) -> Moneyness {
        let upper = strike * (1.0 + MONEYNESS_BAND);
        let lower = strike * (1.0 - MONEYNESS_BAND);
        match self {
            OptionKind::Call if spot > upper => Moneyness::InTheMoney,
            OptionKind::Call if spot < lower => Moneyness::OutOfTheMoney,
            OptionKind::Put if spot < lower => Moneyness::InTheMoney,
            OptionKind::Put if spot > upper => Moneyness::OutOfTheMoney,
            _ => Moneyness::AtTheMoney,
        }
    }

    pub fn break_even(&self, strike: f64, premium: f64) -> f64 {
        match self {
            OptionKind::Call => strike + premium,
            OptionKind::Put => strike - premium,
        }
    }

    pub fn max_gain(&self, strike: f64, premium: f64) -> MaxGain {
        match self {
            OptionKind::Call => MaxGain::Unlimited,
            OptionKind::Put => MaxGain::Capped(strike - premium),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionContract {
    pub kind: OptionKind,
    pub strike: f64,
    pub days_to_expiry: u32,
    pub risk_free_rate: f64,
}

impl OptionContract {
    pub fn new(kind: OptionKind, strike: f64, days_to_expiry: u32) -> Self {
        Self {
            kind,
            strike,
            days_to_expiry,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionValuation {
    pub symbol: String,
    pub current_price: f64,
    pub volatility: f64,
    pub kind: OptionKind,
    pub strike: f64,
    pub days_to_expiry: u32,
    pub moneyness: Moneyness,
    pub theoretical_price: f64,
    pub intrinsic_value: f64,
    pub time_value: f64,
    pub break_even: f64,
    pub greeks: Greeks,
    pub probability_itm: f64,
    pub max_loss: f64,
    pub max_gain: MaxGain,
}

/// Annualized volatility of the trailing year (252 returns) of a series.
pub fn historical_volatility(series: &PriceSeries) -> Result<f64, QuantError> {
    let window = series.trailing(TRADING_DAYS_PER_YEAR as usize + 1);
    let returns = ReturnSeries::from_prices(&window)?;
    Ok(returns.annualized_volatility())
}

/// Values a contract on the latest price of `series`.
pub fn value_option(
    series: &PriceSeries,
    contract: &OptionContract,
) -> Result<OptionValuation, QuantError> {
    let volatility = historical_volatility(series)?;
    let spot = series.last_price().ok_or_else(|| QuantError::NoData {
        symbol: series.symbol.clone(),
    })?;
    let inputs = BlackScholesInputs::from_days(
        spot,
        contract.strike,
        contract.days_to_expiry,
        contract.risk_free_rate,
        volatility,
    )?;
    let valuation = price_with_inputs(&series.symbol, contract, &inputs);
    debug!(
        symbol = %series.symbol,
        kind = %contract.kind,
        price = valuation.theoretical_price,
        "option valued"
    );
    Ok(valuation)
}

/// Full valuation for explicit Black-Scholes inputs.
pub fn price_with_inputs(
    symbol: &str,
    contract: &OptionContract,
    inputs: &BlackScholesInputs,
) -> OptionValuation {
    let kind = contract.kind;
    let theoretical_price = kind.price(inputs);
    let intrinsic_value = kind.intrinsic_value(inputs.spot, inputs.strike);
    OptionValuation {
        symbol: symbol.to_string(),
        current_price: inputs.spot,
        volatility: inputs.volatility,
        kind,
        strike: inputs.strike,
        days_to_expiry: contract.days_to_expiry,
        moneyness: kind.moneyness(inputs.spot, inputs.strike),
        theoretical_price,
        intrinsic_value,
        time_value: theoretical_price - intrinsic_value,
        break_even: kind.break_even(inputs.strike, theoretical_price),
        greeks: kind.greeks(inputs),
        probability_itm: kind.probability_itm(inputs),
        max_loss: theoretical_price,
        max_gain: kind.max_gain(inputs.strike, theoretical_price),
    }
}

/// Fetches one calendar year of history ending `as_of` and values the contract.
pub fn analyze_option(
    port: &dyn PriceHistoryPort,
    symbol: &str,
    as_of: NaiveDate,
    contract: &OptionContract,
) -> Result<OptionValuation, QuantError> {
    let start = as_of - Duration::days(CALENDAR_DAYS_PER_YEAR as i64);
    let series = port.fetch_prices(symbol, start, as_of)?;
    if series.is_empty() {
        return Err(QuantError::NoData {
            symbol: symbol.to_string(),
        });
    }
    value_option(&series, contract)
}
