//! CSV file price history adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with a header row. The `date`
//! column and `adj_close` (or `close` when there is no adjusted column) are
//! read; anything else in the file is ignored.

use crate::domain::error::QuantError;
use crate::domain::price_series::{PricePoint, PriceSeries};
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
    earliest: Option<NaiveDate>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            earliest: None,
        }
    }

    /// Never return rows before `earliest`, whatever range is requested.
    pub fn with_earliest(mut self, earliest: Option<NaiveDate>) -> Self {
        self.earliest = earliest;
        self
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

impl PriceHistoryPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, QuantError> {
        let start_date = self.earliest.map_or(start_date, |e| e.max(start_date));
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            QuantError::upstream(symbol, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| QuantError::upstream(symbol, format!("CSV header error: {}", e)))?
            .clone();

        let date_idx = column_index(&headers, "date")
            .ok_or_else(|| QuantError::upstream(symbol, "missing date column"))?;
        let price_idx = column_index(&headers, "adj_close")
            .or_else(|| column_index(&headers, "close"))
            .ok_or_else(|| QuantError::upstream(symbol, "missing close column"))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result
                .map_err(|e| QuantError::upstream(symbol, format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_idx)
                .ok_or_else(|| QuantError::upstream(symbol, "missing date value"))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                QuantError::upstream(symbol, format!("invalid date '{}': {}", date_str, e))
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            // Blank or malformed closes are gaps, not errors.
            let price = record
                .get(price_idx)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN);

            points.push(PricePoint { date, price });
        }

        debug!(symbol, points = points.len(), path = %path.display(), "loaded price file");
        PriceSeries::from_unsorted(symbol, points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            QuantError::upstream(
                "*",
                format!(
                    "failed to read directory {}: {}",
                    self.base_path.display(),
                    e
                ),
            )
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                QuantError::upstream("*", format!("directory entry error: {}", e))
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("AAPL.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n",
        )
        .unwrap();
        fs::write(
            path.join("MSFT.csv"),
            "date,close,adj_close\n\
             2024-01-15,400.0,398.0\n\
             2024-01-16,,\n\
             2024-01-17,410.0,408.5\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "not a price file").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_prices_reads_close_and_sorts() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter
            .fetch_prices("AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.prices(), vec![105.0, 110.0, 115.0]);
        assert_eq!(series.first_date(), Some(date(2024, 1, 15)));
    }

    #[test]
    fn fetch_prices_prefers_adjusted_close_and_keeps_gaps() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter
            .fetch_prices("MSFT", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        let prices = series.prices();

        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0], 398.0);
        assert!(prices[1].is_nan());
        assert_eq!(prices[2], 408.5);
    }

    #[test]
    fn fetch_prices_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter
            .fetch_prices("AAPL", date(2024, 1, 16), date(2024, 1, 16))
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].date, date(2024, 1, 16));
    }

    #[test]
    fn earliest_date_clamps_requested_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).with_earliest(Some(date(2024, 1, 16)));

        let series = adapter
            .fetch_prices("AAPL", date(2023, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(series.prices(), vec![110.0, 115.0]);
    }

    #[test]
    fn fetch_prices_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_prices("XYZ", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, QuantError::UpstreamData { ref symbol, .. } if symbol == "XYZ"));
    }

    #[test]
    fn fetch_prices_rejects_duplicate_dates() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("DUP.csv"),
            "date,close\n2024-01-15,1.0\n2024-01-15,2.0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter
            .fetch_prices("DUP", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, QuantError::UpstreamData { .. }));
    }

    #[test]
    fn fetch_prices_requires_close_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("BAD.csv"), "date,open\n2024-01-15,1.0\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter
            .fetch_prices("BAD", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }
}
