//! Price history access port.
//!
//! The engine never fetches data itself; callers hand it an implementation of
//! this trait and every engine entry point that needs history goes through it.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub trait PriceHistoryPort: Sync {
    /// Ordered prices for `symbol` within `[start_date, end_date]`.
    ///
    /// An unknown symbol may return an empty series; transport failures are
    /// reported as `QuantError::UpstreamData`.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, QuantError>;

    fn list_symbols(&self) -> Result<Vec<String>, QuantError>;
}
