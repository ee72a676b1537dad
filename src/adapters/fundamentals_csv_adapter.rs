//! Fundamentals lookup served from a CSV snapshot.

use crate::adapters::csv_store::{fmt_opt, load_or_empty, Row, Tabular};
use crate::domain::error::TradestoreError;
use crate::domain::report::Issue;
use crate::domain::signal::Fundamentals;
use crate::ports::fundamentals_port::FundamentalsPort;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const DATASET: &str = "fundamentals";

/// One row of the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalsRow {
    pub symbol: String,
    pub fundamentals: Fundamentals,
}

impl Tabular for FundamentalsRow {
    const COLUMNS: &'static [&'static str] = &[
        "Symbol",
        "PE_Ratio",
        "Industry_PE",
        "Last_Quarter_Profit",
        "Last_Year_Same_Quarter_Profit",
    ];
    const REQUIRED: &'static [&'static str] = &["Symbol"];

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        // Vendors write "No Data" / "N/A" for unknowns; treat any non-number as null.
        let lenient = |column: &str| row.number(column).ok().flatten();
        Ok(FundamentalsRow {
            symbol: row.required("Symbol")?.to_string(),
            fundamentals: Fundamentals {
                pe_ratio: lenient("PE_Ratio"),
                industry_pe: lenient("Industry_PE"),
                last_quarter_profit: lenient("Last_Quarter_Profit"),
                last_year_same_quarter_profit: lenient("Last_Year_Same_Quarter_Profit"),
            },
        })
    }

    fn to_row(&self) -> Vec<String> {
        let f = &self.fundamentals;
        vec![
            self.symbol.clone(),
            fmt_opt(f.pe_ratio),
            fmt_opt(f.industry_pe),
            fmt_opt(f.last_quarter_profit),
            fmt_opt(f.last_year_same_quarter_profit),
        ]
    }
}

pub struct FundamentalsCsvAdapter {
    by_symbol: HashMap<String, Fundamentals>,
    issues: Vec<Issue>,
}

impl FundamentalsCsvAdapter {
    /// Read the snapshot at `path`. An absent file gives an adapter on which
    /// every lookup misses.
    pub fn load(path: &Path) -> Result<Self, TradestoreError> {
        if !path.exists() {
            warn!(path = %path.display(), "fundamentals snapshot not found, all lookups will miss");
        }
        let loaded = load_or_empty::<FundamentalsRow>(path, DATASET)?;
        let adapter = Self::from_rows(loaded.records).with_issues(loaded.issues);
        info!(symbols = adapter.by_symbol.len(), "fundamentals snapshot loaded");
        Ok(adapter)
    }

    pub fn from_rows(rows: Vec<FundamentalsRow>) -> Self {
        let by_symbol = rows
            .into_iter()
            .map(|r| (normalize(&r.symbol), r.fundamentals))
            .collect();
        FundamentalsCsvAdapter {
            by_symbol,
            issues: Vec::new(),
        }
    }

    fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Snapshot rows that could not be read.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

impl FundamentalsPort for FundamentalsCsvAdapter {
    fn lookup_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>, TradestoreError> {
        Ok(self
            .by_symbol
            .get(&normalize(symbol))
            .copied()
            .filter(|f| !f.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lookup_is_case_insensitive_and_misses_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fundamentals.csv");
        fs::write(
            &path,
            "Symbol,PE_Ratio,Industry_PE,Last_Quarter_Profit,Last_Year_Same_Quarter_Profit\n\
             TCS.NS,28.5,31,12000,11000\n\
             INFY.NS,No Data,25,N/A,\n",
        )
        .unwrap();

        let adapter = FundamentalsCsvAdapter::load(&path).unwrap();
        let tcs = adapter.lookup_fundamentals("tcs.ns").unwrap().unwrap();
        assert_eq!(tcs.pe_ratio, Some(28.5));
        assert_eq!(tcs.last_year_same_quarter_profit, Some(11000.0));

        let infy = adapter.lookup_fundamentals("INFY.NS").unwrap().unwrap();
        assert_eq!(infy.pe_ratio, None);
        assert_eq!(infy.industry_pe, Some(25.0));

        assert_eq!(adapter.lookup_fundamentals("WIPRO.NS").unwrap(), None);
        assert!(adapter.issues().is_empty());
    }

    #[test]
    fn row_without_any_value_counts_as_miss() {
        let adapter = FundamentalsCsvAdapter::from_rows(vec![FundamentalsRow {
            symbol: "A".into(),
            fundamentals: Fundamentals::default(),
        }]);
        assert_eq!(adapter.lookup_fundamentals("A").unwrap(), None);
    }

    #[test]
    fn absent_snapshot_misses_everything() {
        let dir = TempDir::new().unwrap();
        let adapter = FundamentalsCsvAdapter::load(&dir.path().join("none.csv")).unwrap();
        assert_eq!(adapter.lookup_fundamentals("TCS.NS").unwrap(), None);
    }
}
