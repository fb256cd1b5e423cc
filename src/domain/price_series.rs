//! Price series representation.
//!
//! A `PriceSeries` is the only market input the engine consumes: ordered
//! `(date, price)` points for one symbol, ascending, without duplicate dates.
//! Prices may be NaN where the upstream feed had a gap; the return builder
//! drops those rather than zeroing them.

use crate::domain::error::QuantError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, rejecting out-of-order or duplicate dates.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, QuantError> {
        let symbol = symbol.into();
        for w in points.windows(2) {
            if w[1].date <= w[0].date {
                return Err(QuantError::upstream(
                    &symbol,
                    format!(
                        "dates must be strictly ascending ({} follows {})",
                        w[1].date, w[0].date
                    ),
                ));
            }
        }
        Ok(Self { symbol, points })
    }

    /// Sorts by date first; duplicates are still rejected.
    pub fn from_unsorted(
        symbol: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, QuantError> {
        points.sort_by_key(|p| p.date);
        Self::new(symbol, points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Most recent finite, positive price.
    pub fn last_price(&self) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .map(|p| p.price)
            .find(|p| p.is_finite() && *p > 0.0)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// The trailing `count` points (or the whole series if shorter).
    pub fn trailing(&self, count: usize) -> PriceSeries {
        let start = self.points.len().saturating_sub(count);
        PriceSeries {
            symbol: self.symbol.clone(),
            points: self.points[start..].to_vec(),
        }
    }

    /// Points with a finite, positive price.
    pub fn valid_points(&self) -> Vec<PricePoint> {
        self.points
            .iter()
            .copied()
            .filter(|p| p.price.is_finite() && p.price > 0.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, price: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            price,
        }
    }

    #[test]
    fn accepts_ascending_dates() {
        let series = PriceSeries::new("AAPL", vec![point(1, 10.0), point(2, 11.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.symbol, "AAPL");
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = PriceSeries::new("AAPL", vec![point(1, 10.0), point(1, 11.0)]).unwrap_err();
        assert!(matches!(err, QuantError::UpstreamData { .. }));
    }

    #[test]
    fn rejects_descending_dates() {
        assert!(PriceSeries::new("AAPL", vec![point(2, 10.0), point(1, 11.0)]).is_err());
    }

    #[test]
    fn from_unsorted_sorts() {
        let series =
            PriceSeries::from_unsorted("AAPL", vec![point(3, 3.0), point(1, 1.0), point(2, 2.0)])
                .unwrap();
        assert_eq!(series.prices(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn last_price_skips_trailing_gap() {
        let series =
            PriceSeries::new("AAPL", vec![point(1, 10.0), point(2, 12.0), point(3, f64::NAN)])
                .unwrap();
        assert_eq!(series.last_price(), Some(12.0));
    }

    #[test]
    fn last_price_skips_zero_close() {
        let series =
            PriceSeries::new("AAPL", vec![point(1, 10.0), point(2, 12.0), point(3, 0.0)]).unwrap();
        assert_eq!(series.last_price(), Some(12.0));
    }

    #[test]
    fn last_price_of_empty_series() {
        let series = PriceSeries::new("AAPL", vec![]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.last_price(), None);
    }

    #[test]
    fn trailing_window() {
        let series = PriceSeries::new(
            "AAPL",
            vec![point(1, 1.0), point(2, 2.0), point(3, 3.0), point(4, 4.0)],
        )
        .unwrap();
        assert_eq!(series.trailing(2).prices(), vec![3.0, 4.0]);
        assert_eq!(series.trailing(10).len(), 4);
    }

    #[test]
    fn valid_points_drop_gaps() {
        let series = PriceSeries::new(
            "AAPL",
            vec![point(1, 1.0), point(2, f64::NAN), point(3, 0.0), point(4, 4.0)],
        )
        .unwrap();
        let valid = series.valid_points();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[1].price, 4.0);
    }
}
