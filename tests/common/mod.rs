#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use quantcrew::domain::error::QuantError;
use quantcrew::domain::price_series::{PricePoint, PriceSeries};
use quantcrew::domain::sampling::{normal_draws, seeded_rng};
use quantcrew::ports::price_port::PriceHistoryPort;
use std::collections::HashMap;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceHistoryPort for MockPricePort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, QuantError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantError::upstream(symbol, reason.clone()));
        }
        let points = self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .copied()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .collect()
            })
            .unwrap_or_default();
        PriceSeries::new(symbol, points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Last date of every generated series.
pub fn end_date() -> NaiveDate {
    date("2024-12-31")
}

/// Daily points ending at `end_date()`, one per calendar day.
pub fn points_ending(prices: &[f64]) -> Vec<PricePoint> {
    let first = end_date() - Duration::days(prices.len() as i64 - 1);
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            date: first + Duration::days(i as i64),
            price,
        })
        .collect()
}

/// Geometric random walk with normal daily returns.
pub fn random_walk(seed: u64, len: usize, start: f64, daily_vol: f64) -> Vec<f64> {
    let shocks = normal_draws(&mut seeded_rng(Some(seed)), 0.0005, daily_vol, len).unwrap();
    let mut price = start;
    shocks
        .into_iter()
        .map(|r| {
            price *= 1.0 + r;
            price
        })
        .collect()
}

pub fn linear_dependent(base: &[f64], slope: f64, intercept: f64) -> Vec<f64> {
    base.iter().map(|p| slope * p + intercept).collect()
}

pub fn constant(len: usize, price: f64) -> Vec<f64> {
    vec![price; len]
}

pub fn csv_contents(points: &[PricePoint]) -> String {
    let mut out = String::from("date,close\n");
    for p in points {
        out.push_str(&format!("{},{}\n", p.date.format("%Y-%m-%d"), p.price));
    }
    out
}
