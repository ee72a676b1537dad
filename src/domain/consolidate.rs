//! Consolidation of dated per-strategy signal files into the master set.
//!
//! [`consolidate`] is a pure function of its inputs: the master set is rebuilt
//! from the given sources on every run and nothing carries over from earlier
//! runs.

use crate::domain::signal::{SignalKey, SignalRecord};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

/// The parsed rows of one dated source file.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source_date: NaiveDate,
    pub strategy: String,
    pub records: Vec<SignalRecord>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsolidationSummary {
    pub input_records: usize,
    pub superseded: usize,
}

/// Merge all sources into one record per [`SignalKey`].
///
/// When a key repeats, the record from the most recently dated source wins;
/// between equally dated sources a fired exit beats `NoExitYet`; a full tie
/// goes to the later row. Output is sorted newest signal first, then by
/// symbol, strategy and interval.
pub fn consolidate(sources: &[SourceBatch]) -> (Vec<SignalRecord>, ConsolidationSummary) {
    let mut summary = ConsolidationSummary::default();
    let mut merged: HashMap<SignalKey, (Precedence, SignalRecord)> = HashMap::new();

    for source in sources {
        for record in &source.records {
            summary.input_records += 1;
            let rank = Precedence::of(source.source_date, record);
            let key = record.key();
            match merged.get(&key) {
                Some((existing, _)) if rank < *existing => {
                    summary.superseded += 1;
                }
                Some(_) => {
                    summary.superseded += 1;
                    merged.insert(key, (rank, record.clone()));
                }
                None => {
                    merged.insert(key, (rank, record.clone()));
                }
            }
        }
    }

    let mut records: Vec<SignalRecord> = merged.into_values().map(|(_, r)| r).collect();
    sort_signals(&mut records);
    (records, summary)
}

/// Newest signal date first, then symbol, strategy, interval.
pub fn sort_signals(records: &mut [SignalRecord]) {
    records.sort_by(|a, b| {
        b.signal_date
            .cmp(&a.signal_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.strategy.cmp(&b.strategy))
            .then_with(|| a.interval.cmp(&b.interval))
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Precedence {
    source_date: NaiveDate,
    exited: bool,
}

impl Precedence {
    fn of(source_date: NaiveDate, record: &SignalRecord) -> Self {
        Precedence {
            source_date,
            exited: record.exit_status.has_exited(),
        }
    }
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Precedence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source_date
            .cmp(&other.source_date)
            .then(self.exited.cmp(&other.exited))
    }
}
