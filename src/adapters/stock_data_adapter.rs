//! Latest price from the local per-symbol close history.
//!
//! `<dir>/<SYMBOL>.csv` holds at least `Date` and `Close`. An optional
//! `<dir>/today_date.json` maps a symbol to the date its "today" row carries;
//! without a mapping (or a row on that date) the last row's close is used.

use crate::domain::error::TradestoreError;
use crate::ports::quote_port::{QuoteError, QuotePort};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SERVICE: &str = "stock_data";
pub const TODAY_DATE_FILE: &str = "today_date.json";

pub struct StockDataAdapter {
    dir: PathBuf,
    today_dates: HashMap<String, String>,
}

impl StockDataAdapter {
    pub fn new(dir: PathBuf) -> Self {
        let today_dates = load_today_dates(&dir.join(TODAY_DATE_FILE));
        Self { dir, today_dates }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

fn load_today_dates(path: &Path) -> HashMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return HashMap::new(),
    };
    match serde_json::from_str::<HashMap<String, serde_json::Value>>(&content) {
        Ok(map) => map
            .into_iter()
            .map(|(symbol, value)| {
                let date = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (symbol, date)
            })
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable today-date map");
            HashMap::new()
        }
    }
}

/// Calendar-date part of a `Date` cell, which may carry a time and offset.
fn day(value: &str) -> &str {
    let value = value.trim();
    value.get(..10).unwrap_or(value)
}

impl QuotePort for StockDataAdapter {
    fn name(&self) -> &str {
        SERVICE
    }

    fn ensure_available(&self) -> Result<(), TradestoreError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(TradestoreError::service_unavailable(
                SERVICE,
                format!("price directory {} not found", self.dir.display()),
            ))
        }
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let symbol = symbol.trim();
        let bad = |reason: String| QuoteError::BadData {
            symbol: symbol.to_string(),
            reason,
        };

        let path = self.csv_path(symbol);
        if !path.is_file() {
            return Err(QuoteError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| bad(e.to_string()))?;
        let headers = rdr.headers().map_err(|e| bad(e.to_string()))?.clone();
        let close_idx = headers
            .iter()
            .position(|h| h.trim() == "Close")
            .ok_or_else(|| bad("no Close column".into()))?;
        let date_idx = headers.iter().position(|h| h.trim() == "Date");
        let target = self.today_dates.get(symbol).map(|d| d.trim());

        let mut last_close = None;
        for result in rdr.records() {
            let record = result.map_err(|e| bad(e.to_string()))?;
            let close = record.get(close_idx).map(str::trim).unwrap_or_default();
            let Ok(close) = close.parse::<f64>() else {
                continue;
            };
            if !close.is_finite() {
                continue;
            }
            let on_target = match (target, date_idx.and_then(|i| record.get(i))) {
                (Some(t), Some(d)) => day(d) == day(t),
                _ => false,
            };
            if on_target {
                debug!(symbol, "close on mapped today date");
                return Ok(close);
            }
            last_close = Some(close);
        }

        last_close.ok_or_else(|| bad("no usable Close rows".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("TCS.NS.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2026-02-06,100,101,99,100.5,1000\n\
             2026-02-09,101,103,100,102.25,1200\n\
             2026-02-10,102,104,101,103.75,900\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("INFY.NS.csv"),
            "Date,Close\n2026-02-09 00:00:00+05:30,1500\n2026-02-10 00:00:00+05:30,1510\n",
        )
        .unwrap();
        fs::write(dir.path().join("BAD.NS.csv"), "Date,Open\n2026-02-09,1\n").unwrap();
        dir
    }

    #[test]
    fn last_close_without_mapping() {
        let dir = setup();
        let adapter = StockDataAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.latest_price("TCS.NS").unwrap(), 103.75);
    }

    #[test]
    fn mapped_date_is_preferred() {
        let dir = setup();
        fs::write(
            dir.path().join(TODAY_DATE_FILE),
            r#"{"TCS.NS": "2026-02-09", "INFY.NS": "2026-02-09"}"#,
        )
        .unwrap();
        let adapter = StockDataAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.latest_price("TCS.NS").unwrap(), 102.25);
        assert_eq!(adapter.latest_price("INFY.NS").unwrap(), 1500.0);
    }

    #[test]
    fn missing_symbol_and_bad_file_are_per_symbol_errors() {
        let dir = setup();
        let adapter = StockDataAdapter::new(dir.path().to_path_buf());
        assert!(matches!(
            adapter.latest_price("WIPRO.NS"),
            Err(QuoteError::NotFound { .. })
        ));
        assert!(matches!(
            adapter.latest_price("BAD.NS"),
            Err(QuoteError::BadData { .. })
        ));
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let adapter = StockDataAdapter::new(dir.path().join("absent"));
        let err = adapter.ensure_available().unwrap_err();
        assert!(matches!(err, TradestoreError::ServiceUnavailable { .. }));
    }
}
