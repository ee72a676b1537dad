//! Stage orchestration: each stage reads its inputs from the data directory,
//! runs the domain logic and persists its outputs.

use crate::adapters::csv_schema::{ALL_SIGNALS, EntryRow, ExitRow, POTENTIAL_ENTRY, POTENTIAL_EXIT};
use crate::adapters::csv_store::{self, latest_dated_files, load_raw_source};
use crate::adapters::fetch_metadata::{self, FetchMetadata};
use crate::domain::consolidate::{consolidate, sort_signals, SourceBatch};
use crate::domain::enrich::enrich_fundamentals;
use crate::domain::error::TradestoreError;
use crate::domain::position::{PositionBook, PositionRecord};
use crate::domain::price_refresh::{apply_prices, distinct_symbols, fetch_prices};
use crate::domain::reconcile::reconcile_books;
use crate::domain::report::{Issue, Stage, StageReport};
use crate::domain::settings::Settings;
use crate::domain::signal::SignalRecord;
use crate::ports::fundamentals_port::FundamentalsPort;
use crate::ports::quote_port::QuotePort;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Locations of every dataset under the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPaths {
    pub data_dir: PathBuf,
    pub all_signals: PathBuf,
    pub potential_entry: PathBuf,
    pub potential_exit: PathBuf,
    pub monitored: PathBuf,
    pub bought: PathBuf,
    pub metadata: PathBuf,
}

impl DatasetPaths {
    pub fn new(data_dir: &Path) -> Self {
        let csv = |name: &str| data_dir.join(format!("{name}.csv"));
        DatasetPaths {
            data_dir: data_dir.to_path_buf(),
            all_signals: csv(ALL_SIGNALS),
            potential_entry: csv(POTENTIAL_ENTRY),
            potential_exit: csv(POTENTIAL_EXIT),
            monitored: csv(PositionBook::Monitored.dataset()),
            bought: csv(PositionBook::Bought.dataset()),
            metadata: data_dir.join(fetch_metadata::FILE_NAME),
        }
    }

    fn position_book(&self, book: PositionBook) -> &Path {
        match book {
            PositionBook::Monitored => &self.monitored,
            PositionBook::Bought => &self.bought,
        }
    }
}

/// Rebuild `all_signals` from the newest dated strategy files, enrich it with
/// fundamentals and record the fetch time.
///
/// Fails, leaving the previous master in place, when no source file exists
/// for any strategy or when a source file lacks a required column.
pub fn consolidate_signals(
    settings: &Settings,
    fundamentals: &dyn FundamentalsPort,
) -> Result<StageReport, TradestoreError> {
    let paths = DatasetPaths::new(&settings.paths.data_dir);
    let mut report = StageReport::new(Stage::Consolidate);
    info!(
        data_dir = %paths.data_dir.display(),
        strategies = ?settings.strategies,
        "consolidating signals"
    );

    let mut batches = Vec::new();
    for strategy in &settings.strategies {
        let files = latest_dated_files(&paths.data_dir, strategy, settings.history_depth)?;
        if files.is_empty() {
            let pattern = paths.data_dir.join(format!("YYYY-MM-DD_{strategy}.csv"));
            warn!(strategy, "no dated source file found");
            report.extend([Issue::SourceMissing { path: pattern }]);
            continue;
        }

        for (source_date, path) in files {
            let loaded = match load_raw_source(&path, strategy) {
                Ok(loaded) => loaded,
                Err(TradestoreError::DataSourceMissing { path }) => {
                    warn!(path = %path.display(), "source file vanished");
                    report.extend([Issue::SourceMissing { path }]);
                    continue;
                }
                Err(e) => return Err(e),
            };
            info!(
                file = %path.display(),
                records = loaded.records.len(),
                skipped = loaded.issues.len(),
                "source loaded"
            );
            report.extend(loaded.issues);
            batches.push(SourceBatch {
                source_date,
                strategy: strategy.clone(),
                records: loaded.records,
            });
        }
    }

    if batches.is_empty() {
        error!(data_dir = %paths.data_dir.display(), "no signal sources at all, keeping previous master");
        return Err(TradestoreError::DataSourceMissing {
            path: paths.data_dir,
        });
    }

    let (mut records, summary) = consolidate(&batches);
    info!(
        input = summary.input_records,
        superseded = summary.superseded,
        output = records.len(),
        "signals consolidated"
    );

    let enrichment = enrich_fundamentals(&mut records, fundamentals)?;
    info!(
        symbols = enrichment.symbols_looked_up,
        enriched = enrichment.records_enriched,
        missed = enrichment.missed_symbols.len(),
        "fundamentals attached"
    );
    report.extend(enrichment.issues());

    csv_store::save(&paths.all_signals, &records)?;
    report.record_written(ALL_SIGNALS, records.len());

    let metadata = FetchMetadata::new(Local::now().naive_local(), &settings.timezone);
    fetch_metadata::write(&paths.metadata, &metadata)?;

    info!(%report, "consolidate finished");
    Ok(report)
}

/// Rebuild `potential_entry` and `potential_exit` from `all_signals`.
///
/// Today prices are refreshed for the records that pass the price-independent
/// filter before the entry band is applied. An unreachable price service does
/// not fail the stage: classification runs on the stored prices and the
/// report says so.
pub fn classify_signals(
    settings: &Settings,
    quotes: &dyn QuotePort,
) -> Result<StageReport, TradestoreError> {
    let paths = DatasetPaths::new(&settings.paths.data_dir);
    let mut report = StageReport::new(Stage::Classify);
    let filters = &settings.filters;

    let loaded = csv_store::load::<SignalRecord>(&paths.all_signals, ALL_SIGNALS)?;
    report.extend(loaded.issues);
    let mut records = loaded.records;
    sort_signals(&mut records);

    let fetch_date = fetch_metadata::fetch_date_or_today(&paths.metadata);
    info!(records = records.len(), %fetch_date, "classifying signals");

    let symbols = distinct_symbols(filters.price_candidates(&records));
    match fetch_prices(quotes, &symbols, settings.prices.workers) {
        Ok(batch) => {
            let updated = apply_prices(
                &mut records,
                &batch,
                |r| r.symbol.as_str(),
                |r, price| r.today_price = Some(price),
            );
            debug!(candidates = symbols.len(), updated, "prices applied");
            report.extend(batch.issues());
        }
        Err(e @ TradestoreError::ServiceUnavailable { .. }) => {
            warn!(error = %e, "classifying on stored prices");
            report.extend([Issue::PricesStale {
                reason: e.to_string(),
            }]);
        }
        Err(e) => return Err(e),
    }

    let classification = filters.classify(&records, fetch_date);
    let entries: Vec<EntryRow> = classification.entries.into_iter().map(EntryRow).collect();
    let exits: Vec<ExitRow> = classification.exits.into_iter().map(ExitRow).collect();

    csv_store::save(&paths.potential_entry, &entries)?;
    report.record_written(POTENTIAL_ENTRY, entries.len());
    csv_store::save(&paths.potential_exit, &exits)?;
    report.record_written(POTENTIAL_EXIT, exits.len());

    info!(%report, "classify finished");
    Ok(report)
}

/// Merge the latest signal data into `monitored_trades` and `trades_bought`
/// and refresh their today prices.
///
/// A missing `all_signals` leaves every position unmatched; prices are still
/// refreshed. Nothing is written when the price service is unavailable.
pub fn reconcile_positions(
    settings: &Settings,
    quotes: &dyn QuotePort,
) -> Result<StageReport, TradestoreError> {
    let paths = DatasetPaths::new(&settings.paths.data_dir);
    let mut report = StageReport::new(Stage::Reconcile);

    if !paths.all_signals.exists() {
        warn!(
            path = %paths.all_signals.display(),
            "no consolidated signals, every position stays unmatched"
        );
        report.extend([Issue::SourceMissing {
            path: paths.all_signals.clone(),
        }]);
    }
    let signals = csv_store::load_or_empty::<SignalRecord>(&paths.all_signals, ALL_SIGNALS)?;
    report.extend(signals.issues);

    let (monitored_existed, mut monitored) = load_book(&paths, PositionBook::Monitored, &mut report)?;
    let (bought_existed, mut bought) = load_book(&paths, PositionBook::Bought, &mut report)?;

    info!(
        signals = signals.records.len(),
        monitored = monitored.len(),
        bought = bought.len(),
        "reconciling positions"
    );

    let (summaries, batch) = reconcile_books(
        &mut monitored,
        &mut bought,
        &signals.records,
        quotes,
        settings.prices.workers,
    )?;
    for summary in &summaries {
        if !summary.unmatched.is_empty() {
            warn!(
                dataset = summary.book.dataset(),
                symbols = ?summary.unmatched_symbols(),
                "positions without a matching signal kept as they were"
            );
        }
        report.extend(summary.issues());
    }
    report.extend(batch.issues());

    for (book, existed, records) in [
        (PositionBook::Monitored, monitored_existed, &monitored),
        (PositionBook::Bought, bought_existed, &bought),
    ] {
        if !existed && records.is_empty() {
            continue;
        }
        csv_store::save(paths.position_book(book), records)?;
        report.record_written(book.dataset(), records.len());
    }

    info!(%report, "reconcile finished");
    Ok(report)
}

/// Positions of one book, and whether its file existed before this run.
fn load_book(
    paths: &DatasetPaths,
    book: PositionBook,
    report: &mut StageReport,
) -> Result<(bool, Vec<PositionRecord>), TradestoreError> {
    let path = paths.position_book(book);
    let existed = path.exists();
    let loaded = csv_store::load_or_empty::<PositionRecord>(path, book.dataset())?;
    report.extend(loaded.issues);
    Ok((existed, loaded.records))
}

/// Outcome of every stage of a full run, in execution order.
#[derive(Debug)]
pub struct RunOutcome {
    pub stages: Vec<(Stage, Result<StageReport, TradestoreError>)>,
}

impl RunOutcome {
    /// The first stage error, if any.
    pub fn first_error(&self) -> Option<&TradestoreError> {
        self.stages.iter().find_map(|(_, r)| r.as_ref().err())
    }

    pub fn report(&self, stage: Stage) -> Option<&StageReport> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .and_then(|(_, r)| r.as_ref().ok())
    }
}

/// Consolidate, then classify, then reconcile. A failing stage is logged and
/// recorded; the later stages still run against whatever `all_signals`
/// holds.
pub fn run_all(
    settings: &Settings,
    fundamentals: &dyn FundamentalsPort,
    quotes: &dyn QuotePort,
) -> RunOutcome {
    let mut stages = Vec::with_capacity(3);

    let consolidated = consolidate_signals(settings, fundamentals);
    log_failure(Stage::Consolidate, &consolidated);
    stages.push((Stage::Consolidate, consolidated));

    let classified = classify_signals(settings, quotes);
    log_failure(Stage::Classify, &classified);
    stages.push((Stage::Classify, classified));

    let reconciled = reconcile_positions(settings, quotes);
    log_failure(Stage::Reconcile, &reconciled);
    stages.push((Stage::Reconcile, reconciled));

    RunOutcome { stages }
}

fn log_failure(stage: Stage, result: &Result<StageReport, TradestoreError>) {
    if let Err(e) = result {
        error!(%stage, error = %e, "stage failed");
    }
}
