//! Simple moving average of closing prices.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price_series::PricePoint;

pub fn calculate_sma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(points.len());
    let mut window_sum = 0.0;

    for (i, point) in points.iter().enumerate() {
        window_sum += point.price;
        if period > 0 && i >= period {
            window_sum -= points[i - period].price;
        }

        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::invalid(point.date));
        } else {
            values.push(IndicatorPoint {
                date: point.date,
                valid: true,
                value: window_sum / period as f64,
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
