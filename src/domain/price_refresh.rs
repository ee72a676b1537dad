//! Batched "today price" resolution.
//!
//! Symbols are fanned out over a bounded rayon pool. Each worker returns its
//! own result; the map is assembled only after every worker has finished, so
//! one symbol's failure cannot affect another's.

use crate::domain::error::TradestoreError;
use crate::domain::report::{Issue, LookupKind};
use crate::ports::quote_port::{QuoteError, QuotePort};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PriceBatch {
    pub results: BTreeMap<String, Result<f64, QuoteError>>,
}

impl PriceBatch {
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.results.get(symbol).and_then(|r| r.as_ref().ok().copied())
    }

    pub fn resolved(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(s, _)| s.as_str())
            .collect()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.failed_symbols()
            .into_iter()
            .map(|symbol| Issue::LookupMiss {
                symbol: symbol.to_string(),
                kind: LookupKind::Price,
            })
            .collect()
    }
}

/// Distinct, non-empty symbols in first-seen order.
pub fn distinct_symbols<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    symbols
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// Resolve the latest price for every symbol with at most `workers` lookups
/// in flight.
///
/// Returns `ServiceUnavailable` when the port reports itself unreachable, or
/// when every symbol failed at the transport level. Any other per-symbol
/// failure is carried in the batch.
pub fn fetch_prices(
    port: &dyn QuotePort,
    symbols: &[String],
    workers: usize,
) -> Result<PriceBatch, TradestoreError> {
    if symbols.is_empty() {
        return Ok(PriceBatch::default());
    }
    port.ensure_available()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| TradestoreError::service_unavailable(port.name(), e.to_string()))?;

    let fetched: Vec<(String, Result<f64, QuoteError>)> = pool.install(|| {
        symbols
            .par_iter()
            .map(|symbol| (symbol.clone(), port.latest_price(symbol)))
            .collect()
    });

    let batch = PriceBatch {
        results: fetched.into_iter().collect(),
    };

    if batch.resolved() == 0
        && batch
            .results
            .values()
            .all(|r| matches!(r, Err(e) if e.is_transport()))
    {
        let reason = batch
            .results
            .values()
            .find_map(|r| r.as_ref().err().map(|e| e.to_string()))
            .unwrap_or_default();
        return Err(TradestoreError::service_unavailable(port.name(), reason));
    }

    for symbol in batch.failed_symbols() {
        debug!(symbol, "price lookup failed, keeping previous value");
    }
    info!(
        source = port.name(),
        requested = symbols.len(),
        resolved = batch.resolved(),
        "prices refreshed"
    );
    Ok(batch)
}

/// Write resolved prices through `set`; failed symbols are left alone.
/// Returns the number of items updated.
pub fn apply_prices<T>(
    items: &mut [T],
    batch: &PriceBatch,
    symbol_of: impl Fn(&T) -> &str,
    mut set: impl FnMut(&mut T, f64),
) -> usize {
    let mut updated = 0;
    for item in items.iter_mut() {
        if let Some(price) = batch.price(symbol_of(item)) {
            set(item, price);
            updated += 1;
        }
    }
    updated
}
