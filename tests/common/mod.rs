#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tradestore::adapters::fetch_metadata::{self, FetchMetadata};
use tradestore::adapters::file_config_adapter::FileConfigAdapter;
use tradestore::domain::error::TradestoreError;
use tradestore::domain::raw_signal;
use tradestore::domain::settings::{load_settings, Settings};
use tradestore::domain::signal::Fundamentals;
use tradestore::pipeline::DatasetPaths;
use tradestore::ports::fundamentals_port::FundamentalsPort;
use tradestore::ports::quote_port::{QuoteError, QuotePort};

pub struct MockQuotes {
    pub prices: HashMap<String, f64>,
    pub offline: bool,
    /// Number of availability probes that fail with a non-service error.
    pub probe_errors: AtomicUsize,
    pub calls: AtomicUsize,
}

impl MockQuotes {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            offline: false,
            probe_errors: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn failing_first_probes(self, n: usize) -> Self {
        self.probe_errors.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuotePort for MockQuotes {
    fn name(&self) -> &str {
        "mock"
    }

    fn ensure_available(&self) -> Result<(), TradestoreError> {
        if self.offline {
            return Err(TradestoreError::service_unavailable("mock", "offline"));
        }
        let remaining = self.probe_errors.load(Ordering::SeqCst);
        if remaining > 0 {
            self.probe_errors.store(remaining - 1, Ordering::SeqCst);
            return Err(TradestoreError::Io(std::io::Error::other("probe failed")));
        }
        Ok(())
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

pub struct MockFundamentals {
    pub data: HashMap<String, Fundamentals>,
}

impl MockFundamentals {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with(mut self, symbol: &str, pe: f64, industry_pe: f64, last_q: f64, year_ago_q: f64) -> Self {
        self.data.insert(
            symbol.to_string(),
            Fundamentals {
                pe_ratio: Some(pe),
                industry_pe: Some(industry_pe),
                last_quarter_profit: Some(last_q),
                last_year_same_quarter_profit: Some(year_ago_q),
            },
        );
        self
    }
}

impl FundamentalsPort for MockFundamentals {
    fn lookup_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>, TradestoreError> {
        Ok(self.data.get(symbol).copied())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One upstream row: signal, exit, win-rate, interval, trend cells.
pub struct RawRow {
    pub signal: String,
    pub exit: String,
    pub win_rate: String,
    pub interval: String,
    pub trend: String,
}

pub fn raw_row(symbol: &str, signal_date: &str, price: f64, win_rate: f64, trades: u32) -> RawRow {
    RawRow {
        signal: format!("{symbol}, Long, {signal_date} (Price: {price})"),
        exit: "No Exit Yet".to_string(),
        win_rate: format!("{win_rate}%, Past 4 years, {trades}"),
        interval: format!("Daily, is CONFIRMED on {signal_date}"),
        trend: String::new(),
    }
}

impl RawRow {
    pub fn short(mut self) -> Self {
        self.signal = self.signal.replace(", Long,", ", Short,");
        self
    }

    pub fn exited(mut self, exit_date: &str, price: f64) -> Self {
        self.exit = format!("{exit_date} (Price: {price})");
        self
    }

    pub fn trend(mut self, start: f64, end: f64) -> Self {
        self.trend = format!("2025-12-18 (Price: {start})/2026-02-09 (Price: {end})");
        self
    }

    pub fn interval(mut self, interval: &str) -> Self {
        self.interval = format!("{interval}, is CONFIRMED");
        self
    }
}

/// A temporary data directory, stock-data directory and matching settings.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
    pub paths: DatasetPaths,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended to a config that points at the temp directories.
    pub fn with_config(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("trade_store");
        let stock_dir = dir.path().join("stock_data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::create_dir_all(&stock_dir).unwrap();

        let ini = format!(
            "[paths]\ndata_dir = {}\nstock_data_dir = {}\n\n[metadata]\ntimezone = IST\n\n{extra}",
            data_dir.display(),
            stock_dir.display()
        );
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let settings = load_settings(&config).unwrap();
        let paths = DatasetPaths::new(&data_dir);
        Self {
            dir,
            settings,
            paths,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.settings.paths.data_dir
    }

    pub fn stock_dir(&self) -> &Path {
        &self.settings.paths.stock_data_dir
    }

    pub fn write_raw_source(&self, file_date: &str, strategy: &str, rows: &[RawRow]) -> PathBuf {
        let path = self.data_dir().join(format!("{file_date}_{strategy}.csv"));
        let mut wtr = csv::Writer::from_path(&path).unwrap();
        wtr.write_record([
            raw_signal::SIGNAL_COLUMN,
            raw_signal::EXIT_COLUMN,
            raw_signal::WIN_RATE_COLUMN,
            raw_signal::INTERVAL_COLUMN,
            raw_signal::TREND_COLUMN,
        ])
        .unwrap();
        for row in rows {
            wtr.write_record([&row.signal, &row.exit, &row.win_rate, &row.interval, &row.trend])
                .unwrap();
        }
        wtr.flush().unwrap();
        path
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.data_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_fundamentals(&self, rows: &[(&str, &str, &str, &str, &str)]) {
        let mut content =
            String::from("Symbol,PE_Ratio,Industry_PE,Last_Quarter_Profit,Last_Year_Same_Quarter_Profit\n");
        for (symbol, pe, ind, lq, ly) in rows {
            content.push_str(&format!("{symbol},{pe},{ind},{lq},{ly}\n"));
        }
        fs::write(&self.settings.paths.fundamentals_file, content).unwrap();
    }

    pub fn write_close(&self, symbol: &str, close: f64) {
        fs::write(
            self.stock_dir().join(format!("{symbol}.csv")),
            format!("Date,Close\n2026-02-11,{}\n2026-02-12,{close}\n", close - 1.0),
        )
        .unwrap();
    }

    pub fn set_fetch_date(&self, d: NaiveDate) {
        let meta = FetchMetadata::new(d.and_hms_opt(18, 0, 0).unwrap(), "IST");
        fetch_metadata::write(&self.paths.metadata, &meta).unwrap();
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }
}
