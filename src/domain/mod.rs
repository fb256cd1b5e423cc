//! Pure analytics engine.
//!
//! Nothing in here performs I/O: price history arrives through
//! [`crate::ports::price_port::PriceHistoryPort`] and randomness through an
//! injected `rand::Rng`.

pub mod error;
pub mod price_series;
pub mod stats;
pub mod returns;
pub mod sampling;
pub mod universe;
pub mod options;
pub mod monte_carlo;
pub mod var;
pub mod cointegration;
pub mod pairs;
pub mod indicator;
pub mod strategy;
pub mod portfolio;
pub mod metrics;
pub mod backtest;
pub mod projection;
pub mod risk_assessment;
pub mod config_validation;
