//! RSI (Relative Strength Index) over simple rolling averages.
//!
//! avg_gain / avg_loss are plain means of the last n price changes (no
//! Wilder smoothing). RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! - avg_loss == 0 and avg_gain > 0: RSI = 100
//! - both zero (flat window): undefined, point is invalid
//!
//! Warmup: first n points are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price_series::PricePoint;

pub fn calculate_rsi(points: &[PricePoint], period: usize) -> IndicatorSeries {
    if period == 0 || points.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: points.iter().map(|p| IndicatorPoint::invalid(p.date)).collect(),
        };
    }

    let changes: Vec<f64> = points.windows(2).map(|w| w[1].price - w[0].price).collect();

    let mut values = Vec::with_capacity(points.len());
    values.push(IndicatorPoint::invalid(points[0].date));

    for (i, point) in points.iter().enumerate().skip(1) {
        // changes[i - 1] is the move into point i
        if i < period {
            values.push(IndicatorPoint::invalid(point.date));
            continue;
        }

        let window = &changes[i - period..i];
        let avg_gain = window.iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss = window.iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

        let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
            None
        } else if avg_loss == 0.0 {
            Some(100.0)
        } else {
            Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
        };

        values.push(match rsi {
            Some(value) => IndicatorPoint {
                date: point.date,
                valid: true,
                value,
            },
            None => IndicatorPoint::invalid(point.date),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_points(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                date: start + Duration::days(i as i64),
                price,
            })
            .collect()
    }

    #[test]
    fn rsi_empty() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_single_point() {
        let series = calculate_rsi(&make_points(&[100.0]), 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_points(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "point {} should be invalid", i);
        }
        assert!(series.values[14].valid);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_points(&prices), 14);
        assert_eq!(series.values[14].get(), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_points(&prices), 14);
        let rsi = series.values[14].get().unwrap();
        assert!(rsi.abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_window_is_invalid() {
        let series = calculate_rsi(&make_points(&[50.0; 10]), 3);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_uses_simple_rolling_mean() {
        // changes: +2, -1, +1, -2 ; window of 2 at index 4 is [+1, -2]
        let series = calculate_rsi(&make_points(&[10.0, 12.0, 11.0, 12.0, 10.0]), 2);
        let rsi = series.values[4].get().unwrap();
        let expected = 100.0 - 100.0 / (1.0 + 0.5 / 1.0);
        assert!((rsi - expected).abs() < 1e-12);

        // window at index 2 is [+2, -1]
        let rsi = series.values[2].get().unwrap();
        let expected = 100.0 - 100.0 / (1.0 + 1.0 / 0.5);
        assert!((rsi - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_points(&prices), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            assert!((0.0..=100.0).contains(&point.value), "RSI {} out of range", point.value);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_points(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(series.indicator_type, IndicatorType::Rsi(0));
    }
}
