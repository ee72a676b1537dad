//! Reconciliation of tracked positions against the consolidated signals.

use crate::domain::error::TradestoreError;
use crate::domain::position::{PositionBook, PositionRecord};
use crate::domain::price_refresh::{apply_prices, distinct_symbols, fetch_prices, PriceBatch};
use crate::domain::report::Issue;
use crate::domain::signal::{SignalKey, SignalRecord};
use crate::ports::quote_port::QuotePort;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileSummary {
    pub book: PositionBook,
    pub total: usize,
    pub matched: usize,
    pub unmatched: Vec<SignalKey>,
    pub prices_updated: usize,
}

impl ReconcileSummary {
    pub fn issues(&self) -> Vec<Issue> {
        self.unmatched
            .iter()
            .map(|key| Issue::UnmatchedPosition {
                dataset: self.book.dataset().to_string(),
                key: key.to_string(),
            })
            .collect()
    }

    pub fn unmatched_symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.unmatched.iter().map(|k| k.symbol.as_str()).collect();
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }
}

/// Overwrite the signal-derived fields of every position whose key is found
/// in `signals`. Unmatched positions are kept exactly as they were.
pub fn reconcile(
    book: PositionBook,
    positions: &mut [PositionRecord],
    signals: &[SignalRecord],
) -> ReconcileSummary {
    let index: HashMap<SignalKey, &SignalRecord> = signals.iter().map(|s| (s.key(), s)).collect();

    let mut summary = ReconcileSummary {
        book,
        total: positions.len(),
        matched: 0,
        unmatched: Vec::new(),
        prices_updated: 0,
    };

    for position in positions.iter_mut() {
        let key = position.key();
        match index.get(&key) {
            Some(signal) => {
                position.absorb(signal.update());
                summary.matched += 1;
            }
            None => {
                debug!(dataset = book.dataset(), key = %key, "no matching signal");
                summary.unmatched.push(key);
            }
        }
    }

    info!(
        dataset = book.dataset(),
        total = summary.total,
        matched = summary.matched,
        unmatched = summary.unmatched.len(),
        "positions reconciled"
    );
    summary
}

/// Reconcile both position books and refresh their today prices with one
/// batched lookup across every distinct symbol.
///
/// The lookup runs first: if the price service is unavailable the error is
/// returned and no position is modified.
pub fn reconcile_books(
    monitored: &mut [PositionRecord],
    bought: &mut [PositionRecord],
    signals: &[SignalRecord],
    quotes: &dyn QuotePort,
    workers: usize,
) -> Result<(Vec<ReconcileSummary>, PriceBatch), TradestoreError> {
    let symbols = distinct_symbols(
        monitored
            .iter()
            .chain(bought.iter())
            .map(PositionRecord::symbol),
    );
    let batch = fetch_prices(quotes, &symbols, workers)?;

    let mut summaries = Vec::with_capacity(2);
    for (book, positions) in [
        (PositionBook::Monitored, monitored),
        (PositionBook::Bought, bought),
    ] {
        let mut summary = reconcile(book, positions, signals);
        summary.prices_updated = apply_prices(
            positions,
            &batch,
            PositionRecord::symbol,
            PositionRecord::set_today_price,
        );
        summaries.push(summary);
    }
    Ok((summaries, batch))
}
