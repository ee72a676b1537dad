//! Fundamentals enrichment of signal records.

use crate::domain::error::TradestoreError;
use crate::domain::report::{Issue, LookupKind};
use crate::domain::signal::{Fundamentals, SignalRecord};
use crate::ports::fundamentals_port::FundamentalsPort;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrichSummary {
    pub symbols_looked_up: usize,
    pub records_enriched: usize,
    pub missed_symbols: Vec<String>,
}

impl EnrichSummary {
    pub fn issues(&self) -> Vec<Issue> {
        self.missed_symbols
            .iter()
            .map(|symbol| Issue::LookupMiss {
                symbol: symbol.clone(),
                kind: LookupKind::Fundamentals,
            })
            .collect()
    }
}

/// Overwrite every record's fundamentals with the port's current answer.
///
/// Each distinct symbol is looked up once. A miss leaves the record's
/// fundamentals empty, so running this twice against the same snapshot gives
/// the same result as running it once. An `Err` from the port aborts the
/// whole enrichment without touching any record.
pub fn enrich_fundamentals(
    records: &mut [SignalRecord],
    port: &dyn FundamentalsPort,
) -> Result<EnrichSummary, TradestoreError> {
    let symbols: BTreeSet<&str> = records.iter().map(|r| r.symbol.as_str()).collect();

    let mut resolved: BTreeMap<String, Option<Fundamentals>> = BTreeMap::new();
    for symbol in &symbols {
        let found = port.lookup_fundamentals(symbol)?;
        if found.is_none() {
            debug!(symbol, "no fundamentals");
        }
        resolved.insert(symbol.to_string(), found);
    }

    let mut summary = EnrichSummary {
        symbols_looked_up: resolved.len(),
        ..Default::default()
    };

    for record in records.iter_mut() {
        match resolved.get(&record.symbol).copied().flatten() {
            Some(f) => {
                record.fundamentals = f;
                summary.records_enriched += 1;
            }
            None => record.fundamentals = Fundamentals::default(),
        }
    }

    summary.missed_symbols = resolved
        .into_iter()
        .filter(|(_, f)| f.is_none())
        .map(|(symbol, _)| symbol)
        .collect();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Direction, ExitStatus};
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MapFundamentals {
        data: HashMap<String, Fundamentals>,
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl MapFundamentals {
        fn new(entries: &[(&str, f64)]) -> Self {
            let data = entries
                .iter()
                .map(|(s, pe)| {
                    (
                        s.to_string(),
                        Fundamentals {
                            pe_ratio: Some(*pe),
                            industry_pe: Some(30.0),
                            last_quarter_profit: Some(100.0),
                            last_year_same_quarter_profit: Some(80.0),
                        },
                    )
                })
                .collect();
            Self {
                data,
                calls: RefCell::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl FundamentalsPort for MapFundamentals {
        fn lookup_fundamentals(
            &self,
            symbol: &str,
        ) -> Result<Option<Fundamentals>, TradestoreError> {
            self.calls.borrow_mut().push(symbol.to_string());
            if self.fail {
                return Err(TradestoreError::service_unavailable("fundamentals", "down"));
            }
            Ok(self.data.get(symbol).copied())
        }
    }

    fn record(symbol: &str, strategy: &str) -> SignalRecord {
        SignalRecord {
            symbol: symbol.into(),
            signal_date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            strategy: strategy.into(),
            interval: "Daily".into(),
            direction: Direction::Long,
            signal_price: 100.0,
            win_rate: Some(90.0),
            trade_count: Some(10),
            exit_status: ExitStatus::NoExitYet,
            exit_date: None,
            exit_price: None,
            fundamentals: Fundamentals::default(),
            trend: None,
            today_price: None,
            strategy_cagr: None,
            strategy_sharpe: None,
        }
    }

    #[test]
    fn enriches_hits_and_reports_misses() {
        let port = MapFundamentals::new(&[("TCS.NS", 25.0)]);
        let mut records = vec![record("TCS.NS", "Distance"), record("XYZ.NS", "Distance")];

        let summary = enrich_fundamentals(&mut records, &port).unwrap();

        assert_eq!(records[0].fundamentals.pe_ratio, Some(25.0));
        assert!(records[1].fundamentals.is_empty());
        assert_eq!(summary.records_enriched, 1);
        assert_eq!(summary.missed_symbols, vec!["XYZ.NS"]);
        assert_eq!(summary.issues().len(), 1);
    }

    #[test]
    fn one_lookup_per_distinct_symbol() {
        let port = MapFundamentals::new(&[("TCS.NS", 25.0)]);
        let mut records = vec![record("TCS.NS", "Distance"), record("TCS.NS", "Trendline")];
        enrich_fundamentals(&mut records, &port).unwrap();
        assert_eq!(port.calls.borrow().len(), 1);
    }

    #[test]
    fn miss_clears_stale_fundamentals() {
        let port = MapFundamentals::new(&[]);
        let mut records = vec![record("XYZ.NS", "Distance")];
        records[0].fundamentals.pe_ratio = Some(12.0);
        enrich_fundamentals(&mut records, &port).unwrap();
        assert!(records[0].fundamentals.is_empty());
    }

    #[test]
    fn enrichment_is_idempotent() {
        let port = MapFundamentals::new(&[("TCS.NS", 25.0), ("INFY.NS", 18.0)]);
        let raw = vec![
            record("TCS.NS", "Distance"),
            record("INFY.NS", "Trendline"),
            record("XYZ.NS", "Distance"),
        ];

        let mut once = raw.clone();
        enrich_fundamentals(&mut once, &port).unwrap();

        let mut twice = raw;
        enrich_fundamentals(&mut twice, &port).unwrap();
        enrich_fundamentals(&mut twice, &port).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn port_failure_leaves_records_untouched() {
        let mut port = MapFundamentals::new(&[("TCS.NS", 25.0)]);
        port.fail = true;
        let mut records = vec![record("TCS.NS", "Distance")];
        records[0].fundamentals.pe_ratio = Some(9.0);

        let err = enrich_fundamentals(&mut records, &port).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(records[0].fundamentals.pe_ratio, Some(9.0));
    }
}
