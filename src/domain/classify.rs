//! Potential entry / exit classification.
//!
//! Every record is tested against one shared predicate; entries and exits
//! then add their own conditions. The exit-status split keeps the two lists
//! disjoint.

use crate::domain::signal::{Direction, SignalRecord};
use chrono::NaiveDate;

/// Slack for comparing the price band edges, which are inclusive.
const BAND_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Win rate must be strictly greater.
    pub min_win_rate: f64,
    /// Trade count must be strictly greater.
    pub min_trades: u32,
    /// PE ratio must be strictly lower.
    pub max_pe_ratio: f64,
    /// Last quarter profit must exceed this multiple of the same quarter a year ago.
    pub profit_ratio: f64,
    /// Lower edge of the entry price band, as a fraction (-0.03 = -3%).
    pub band_below: f64,
    /// Upper edge of the entry price band, as a fraction.
    pub band_above: f64,
    /// Calendar days an exit stays "potential" after it fires.
    pub exit_recency_days: i64,
    /// When set, entry signals older than this many days are dropped.
    pub entry_signal_recency_days: Option<i64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_win_rate: 80.0,
            min_trades: 6,
            max_pe_ratio: 50.0,
            profit_ratio: 0.5,
            band_below: -0.03,
            band_above: 0.01,
            exit_recency_days: 3,
            entry_signal_recency_days: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub signal: SignalRecord,
    /// Signed percent move of today's price against the signal price.
    pub price_change_pct: Option<f64>,
    /// Calendar days between the exit and the fetch date.
    pub days_since_exit: Option<i64>,
}

impl Candidate {
    fn new(kind: CandidateKind, signal: &SignalRecord, fetch_date: NaiveDate) -> Self {
        Candidate {
            kind,
            signal: signal.clone(),
            price_change_pct: signal.price_change().map(|c| c * 100.0),
            days_since_exit: signal.exit_date.map(|d| (fetch_date - d).num_days()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Classification {
    pub entries: Vec<Candidate>,
    pub exits: Vec<Candidate>,
}

impl FilterConfig {
    /// Conditions every candidate must meet, entry or exit. None of them
    /// depend on today's price.
    pub fn passes_shared_filter(&self, record: &SignalRecord) -> bool {
        if record.direction != Direction::Long {
            return false;
        }
        match record.win_rate {
            Some(w) if w > self.min_win_rate => {}
            _ => return false,
        }
        match record.trade_count {
            Some(n) if n > self.min_trades => {}
            _ => return false,
        }

        let f = &record.fundamentals;
        match (f.pe_ratio, f.industry_pe) {
            (Some(pe), Some(industry)) if pe < self.max_pe_ratio && industry > pe => {}
            _ => return false,
        }
        match (f.last_quarter_profit, f.last_year_same_quarter_profit) {
            (Some(last_q), Some(year_ago)) if last_q > self.profit_ratio * year_ago => {}
            _ => return false,
        }

        record.trend.is_none_or(|t| t.is_declining())
    }

    pub fn is_potential_entry(&self, record: &SignalRecord, fetch_date: NaiveDate) -> bool {
        if record.exit_status.has_exited() || !self.passes_shared_filter(record) {
            return false;
        }
        if let Some(max_age) = self.entry_signal_recency_days {
            let age = (fetch_date - record.signal_date).num_days();
            if age < 0 || age > max_age {
                return false;
            }
        }
        match record.price_change() {
            Some(change) => {
                change >= self.band_below - BAND_EPSILON && change <= self.band_above + BAND_EPSILON
            }
            None => false,
        }
    }

    pub fn is_potential_exit(&self, record: &SignalRecord, fetch_date: NaiveDate) -> bool {
        if !record.exit_status.has_exited() || !self.passes_shared_filter(record) {
            return false;
        }
        if record.exit_price.is_none() {
            return false;
        }
        match record.exit_date {
            Some(exit_date) => (fetch_date - exit_date).num_days() <= self.exit_recency_days,
            None => false,
        }
    }

    /// Symbols whose today price matters for this run: those of records that
    /// pass the price-independent part of the filter.
    pub fn price_candidates<'a>(&self, records: &'a [SignalRecord]) -> Vec<&'a str> {
        records
            .iter()
            .filter(|r| self.passes_shared_filter(r))
            .map(|r| r.symbol.as_str())
            .collect()
    }

    pub fn classify(&self, records: &[SignalRecord], fetch_date: NaiveDate) -> Classification {
        let mut out = Classification::default();
        for record in records {
            if self.is_potential_entry(record, fetch_date) {
                out.entries
                    .push(Candidate::new(CandidateKind::Entry, record, fetch_date));
            } else if self.is_potential_exit(record, fetch_date) {
                out.exits
                    .push(Candidate::new(CandidateKind::Exit, record, fetch_date));
            }
        }
        out
    }
}
