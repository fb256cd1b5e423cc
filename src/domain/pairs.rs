//! Cointegration-based pairs scanner.
//!
//! Tests candidate pairs of a symbol universe for cointegration and reports
//! the significant ones with their price-spread statistics and a z-score
//! signal. Pair tests run in parallel; ranking happens after collection so
//! the output does not depend on scheduling.

use crate::domain::cointegration::{self, CointegrationTest};
use crate::domain::returns::CALENDAR_DAYS_PER_YEAR;
use crate::domain::stats;
use crate::domain::universe::{self, AlignedPrices, SkippedSymbol};
use crate::ports::price_port::PriceHistoryPort;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const Z_SCORE_ENTRY: f64 = 2.0;
pub const MAX_REPORTED_PAIRS: usize = 10;
pub const MAX_REPORTED_SIGNALS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Pair one symbol against every other symbol.
    AgainstSymbol(String),
    /// Every unordered pair of the universe.
    AllPairs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairSignal {
    Buy,
    Sell,
    BuyFirst,
    BuySecond,
    Hold,
}

impl ScanMode {
    /// Falls back to the all-pairs scan when the test symbol is not in the universe.
    pub fn resolve(self, symbols: &[String]) -> ScanMode {
        if let ScanMode::AgainstSymbol(target) = &self {
            if !symbols.contains(target) {
                warn!(symbol = %target, "test symbol not in universe, scanning all pairs");
                return ScanMode::AllPairs;
            }
        }
        self
    }

    /// Index pairs `(first, second)` to test.
    fn candidates(&self, symbols: &[String]) -> Vec<(usize, usize)> {
        let n = symbols.len();
        match self {
            ScanMode::AgainstSymbol(target) => match symbols.iter().position(|s| s == target) {
                Some(t) => (0..n).filter(|&j| j != t).map(|j| (t, j)).collect(),
                None => Vec::new(),
            },
            ScanMode::AllPairs => (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect(),
        }
    }

    pub fn signal(&self, z_score: f64) -> PairSignal {
        match self {
            ScanMode::AgainstSymbol(_) if z_score < -Z_SCORE_ENTRY => PairSignal::Buy,
            ScanMode::AgainstSymbol(_) if z_score > Z_SCORE_ENTRY => PairSignal::Sell,
            ScanMode::AllPairs if z_score < -Z_SCORE_ENTRY => PairSignal::BuyFirst,
            ScanMode::AllPairs if z_score > Z_SCORE_ENTRY => PairSignal::BuySecond,
            _ => PairSignal::Hold,
        }
    }

    /// Strongest cointegration first against a symbol, widest spread first otherwise.
    fn rank(&self, pairs: &mut [CointegratedPair]) {
        match self {
            ScanMode::AgainstSymbol(_) => pairs.sort_by(|a, b| {
                a.p_value
                    .total_cmp(&b.p_value)
                    .then_with(|| a.pair.cmp(&b.pair))
            }),
            ScanMode::AllPairs => pairs.sort_by(|a, b| {
                b.spread
                    .z_score
                    .abs()
                    .total_cmp(&a.spread.z_score.abs())
                    .then_with(|| a.pair.cmp(&b.pair))
            }),
        }
    }

    fn total_pairs(&self, symbol_count: usize) -> usize {
        match self {
            ScanMode::AgainstSymbol(_) => symbol_count.saturating_sub(1),
            ScanMode::AllPairs => symbol_count * symbol_count.saturating_sub(1) / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadStats {
    pub mean: f64,
    pub std_dev: f64,
    pub current: f64,
    pub z_score: f64,
}

impl SpreadStats {
    /// Statistics of `a - b`; the z-score is 0 for a constant spread.
    pub fn of(a: &[f64], b: &[f64]) -> Self {
        let spread: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
        let mean = stats::mean(&spread);
        let std_dev = stats::std_dev(&spread);
        let current = spread.last().copied().unwrap_or(0.0);
        let z_score = if std_dev > 0.0 {
            (current - mean) / std_dev
        } else {
            0.0
        };
        Self {
            mean,
            std_dev,
            current,
            z_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CointegratedPair {
    pub pair: String,
    pub symbol_a: String,
    pub symbol_b: String,
    pub p_value: f64,
    pub adf_statistic: f64,
    pub hedge_ratio: f64,
    pub correlation: f64,
    pub spread: SpreadStats,
    pub signal: PairSignal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairsScan {
    pub cointegrated_pairs: Vec<CointegratedPair>,
    pub total_pairs_tested: usize,
    pub significant_pairs_found: usize,
    pub trading_signals: Vec<CointegratedPair>,
    pub skipped: Vec<SkippedSymbol>,
    pub error: Option<String>,
}

impl PairsScan {
    fn failed(message: impl Into<String>, skipped: Vec<SkippedSymbol>) -> Self {
        Self {
            skipped,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

fn test_pair(
    prices: &AlignedPrices,
    mode: &ScanMode,
    first: usize,
    second: usize,
) -> Option<CointegratedPair> {
    let symbol_a = &prices.symbols[first];
    let symbol_b = &prices.symbols[second];
    let pair = format!("{}-{}", symbol_a, symbol_b);
    let a = &prices.columns[first];
    let b = &prices.columns[second];

    let test: CointegrationTest = match cointegration::engle_granger(&pair, a, b) {
        Ok(test) => test,
        Err(e) => {
            warn!(pair = %pair, error = %e, "skipping pair");
            return None;
        }
    };
    debug!(pair = %pair, p_value = test.p_value, statistic = test.statistic, "pair tested");
    if !test.is_significant() {
        return None;
    }

    let spread = SpreadStats::of(a, b);
    Some(CointegratedPair {
        pair,
        symbol_a: symbol_a.clone(),
        symbol_b: symbol_b.clone(),
        p_value: test.p_value,
        adf_statistic: test.statistic,
        hedge_ratio: test.hedge_ratio,
        correlation: stats::correlation(a, b),
        signal: mode.signal(spread.z_score),
        spread,
    })
}

/// Scans an aligned price frame.
pub fn scan_aligned(prices: &AlignedPrices, mode: ScanMode) -> PairsScan {
    if prices.symbol_count() < 2 || prices.is_empty() {
        return PairsScan::failed(
            format!(
                "need price history for at least two symbols, have {} with {} common dates",
                prices.symbol_count(),
                prices.len()
            ),
            Vec::new(),
        );
    }

    let mode = mode.resolve(&prices.symbols);
    let candidates = mode.candidates(&prices.symbols);
    let mut pairs: Vec<CointegratedPair> = candidates
        .par_iter()
        .filter_map(|&(i, j)| test_pair(prices, &mode, i, j))
        .collect();

    mode.rank(&mut pairs);
    let significant_pairs_found = pairs.len();
    let trading_signals: Vec<CointegratedPair> = pairs
        .iter()
        .filter(|p| p.signal != PairSignal::Hold)
        .take(MAX_REPORTED_SIGNALS)
        .cloned()
        .collect();
    pairs.truncate(MAX_REPORTED_PAIRS);

    PairsScan {
        cointegrated_pairs: pairs,
        total_pairs_tested: mode.total_pairs(prices.symbol_count()),
        significant_pairs_found,
        trading_signals,
        skipped: Vec::new(),
        error: None,
    }
}

/// Loads one year of history ending `as_of` and scans it.
pub fn scan_pairs(
    port: &dyn PriceHistoryPort,
    symbols: &[String],
    as_of: NaiveDate,
    mode: ScanMode,
) -> PairsScan {
    let start = as_of - Duration::days(CALENDAR_DAYS_PER_YEAR as i64);
    let load = universe::load_aligned(port, symbols, start, as_of);
    if load.prices.is_empty() {
        return PairsScan::failed("no price data retrieved", load.skipped);
    }

    let mut scan = scan_aligned(&load.prices, mode);
    scan.skipped = load.skipped;
    info!(
        tested = scan.total_pairs_tested,
        significant = scan.significant_pairs_found,
        "pairs scan complete"
    );
    scan
}
