//! Symbol universe: parsing symbol lists and loading date-aligned prices.
//!
//! Multi-symbol analyses (VaR, pairs scan) work on an inner join of the
//! symbols' histories: only dates where every loaded symbol has a finite,
//! positive price survive. Symbols that fail to load are skipped and reported, never
//! fatal to the batch.

use crate::domain::error::QuantError;
use crate::domain::returns::ReturnSeries;
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol list is empty")]
    Empty,
}

impl From<UniverseError> for QuantError {
    fn from(err: UniverseError) -> Self {
        QuantError::domain(err.to_string())
    }
}

/// Splits a comma-separated list into trimmed, uppercased symbols.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    FetchFailed { message: String },
    NoData,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed { message } => write!(f, "{}", message),
            SkipReason::NoData => write!(f, "no data found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

/// Prices of several symbols on their common dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedPrices {
    pub symbols: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// One column per symbol, same order as `symbols`.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPrices {
    /// Inner join of already fetched series on date, dropping rows with a
    /// missing, NaN or non-positive price.
    pub fn align(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let width = series.len();
        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (col, (_, points)) in series.iter().enumerate() {
            for &(date, price) in points {
                rows.entry(date).or_insert_with(|| vec![None; width])[col] = Some(price);
            }
        }

        let mut dates = Vec::new();
        let mut columns = vec![Vec::new(); width];
        for (date, row) in rows {
            if row.iter().all(|p| matches!(p, Some(v) if v.is_finite() && *v > 0.0)) {
                dates.push(date);
                for (col, price) in row.into_iter().flatten().enumerate() {
                    columns[col].push(price);
                }
            }
        }

        Self {
            symbols: series.into_iter().map(|(symbol, _)| symbol).collect(),
            dates,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Simple returns per symbol over the aligned rows.
    pub fn returns(&self) -> Vec<Vec<f64>> {
        self.columns
            .iter()
            .map(|col| ReturnSeries::simple_returns(col))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct UniverseLoad {
    pub prices: AlignedPrices,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetches every symbol and aligns the ones that loaded.
pub fn load_aligned(
    port: &dyn PriceHistoryPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> UniverseLoad {
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let series = match port.fetch_prices(symbol, start_date, end_date) {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::FetchFailed {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        if series.is_empty() {
            warn!(symbol = %symbol, "skipping symbol (no data found)");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        let points = series.points().iter().map(|p| (p.date, p.price)).collect();
        loaded.push((symbol.clone(), points));
    }

    let prices = AlignedPrices::align(loaded);
    info!(
        loaded = prices.symbol_count(),
        requested = symbols.len(),
        rows = prices.len(),
        "aligned price history"
    );

    UniverseLoad { prices, skipped }
}
