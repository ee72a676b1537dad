//! Schema-checked CSV record store.
//!
//! Datasets are read through [`Row`], which resolves cells by header name, so
//! column order in the file does not matter. Writes replace the target file
//! atomically.

use crate::domain::error::TradestoreError;
use crate::domain::raw_signal::{self, RawCells};
use crate::domain::report::Issue;
use crate::domain::signal::SignalRecord;
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A record type with a fixed tabular layout.
pub trait Tabular: Sized {
    /// Columns written, in order.
    const COLUMNS: &'static [&'static str];
    /// Columns that must be present in the header on read.
    const REQUIRED: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> Result<Self, String>;

    fn to_row(&self) -> Vec<String>;

    /// Cells of columns outside [`Tabular::COLUMNS`] carried by this record.
    fn extra(&self) -> &[(String, String)] {
        &[]
    }
}

/// One data row with access by column name.
pub struct Row<'a> {
    headers: &'a [String],
    index: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Trimmed cell value; empty cells and absent columns are `None`.
    pub fn cell(&self, column: &str) -> Option<&'a str> {
        let idx = *self.index.get(column)?;
        let value = self.record.get(idx)?.trim();
        if value.is_empty() { None } else { Some(value) }
    }

    pub fn required(&self, column: &str) -> Result<&'a str, String> {
        self.cell(column).ok_or_else(|| format!("empty {column}"))
    }

    pub fn parse<T: FromStr>(&self, column: &str) -> Result<Option<T>, String> {
        match self.cell(column) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid {column} '{v}'")),
        }
    }

    pub fn number(&self, column: &str) -> Result<Option<f64>, String> {
        match self.parse::<f64>(column)? {
            Some(v) if !v.is_finite() => Err(format!("non-finite {column}")),
            other => Ok(other),
        }
    }

    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>, String> {
        match self.cell(column) {
            None => Ok(None),
            Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| format!("invalid {column} '{v}'")),
        }
    }

    /// Columns not in `known`, with their raw (untrimmed) values, in header order.
    pub fn unknown_cells(&self, known: &[&str]) -> Vec<(String, String)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty() && !known.contains(&name.as_str()))
            .map(|(i, name)| {
                (
                    name.clone(),
                    self.record.get(i).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Records read from one dataset plus the rows that had to be skipped.
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub issues: Vec<Issue>,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Loaded {
            records: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Read every row of `path` through `parse`.
///
/// A missing file is `DataSourceMissing`; a header lacking any of `required`
/// is `SchemaInvalid`. A row that fails to parse is skipped and reported as
/// an [`Issue::MalformedRow`].
pub fn read_rows<T>(
    path: &Path,
    dataset: &str,
    required: &[&str],
    mut parse: impl FnMut(&Row<'_>) -> Result<T, String>,
) -> Result<Loaded<T>, TradestoreError> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TradestoreError::DataSourceMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut index = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TradestoreError::SchemaInvalid {
            dataset: dataset.to_string(),
            missing,
        });
    }

    let mut loaded = Loaded::default();
    for result in rdr.records() {
        let (line, outcome) = match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                if record.iter().all(|c| c.trim().is_empty()) {
                    continue;
                }
                let row = Row {
                    headers: &headers,
                    index: &index,
                    record: &record,
                };
                (line, parse(&row))
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                (line, Err(e.to_string()))
            }
        };
        match outcome {
            Ok(value) => loaded.records.push(value),
            Err(reason) => {
                warn!(dataset, line, %reason, "skipping malformed row");
                loaded.issues.push(Issue::MalformedRow {
                    dataset: dataset.to_string(),
                    line,
                    reason,
                });
            }
        }
    }

    debug!(
        dataset,
        path = %path.display(),
        records = loaded.records.len(),
        skipped = loaded.issues.len(),
        "dataset loaded"
    );
    Ok(loaded)
}

pub fn load<T: Tabular>(path: &Path, dataset: &str) -> Result<Loaded<T>, TradestoreError> {
    read_rows(path, dataset, T::REQUIRED, T::from_row)
}

/// Like [`load`], but a file that does not exist yet is an empty dataset.
pub fn load_or_empty<T: Tabular>(path: &Path, dataset: &str) -> Result<Loaded<T>, TradestoreError> {
    match load(path, dataset) {
        Err(TradestoreError::DataSourceMissing { .. }) => {
            debug!(dataset, path = %path.display(), "no file yet, starting empty");
            Ok(Loaded::default())
        }
        other => other,
    }
}

/// Replace `path` with `records`. Extra columns carried by the records are
/// appended after [`Tabular::COLUMNS`] in first-seen order.
pub fn save<T: Tabular>(path: &Path, records: &[T]) -> Result<(), TradestoreError> {
    let mut extra_columns: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in record.extra() {
            if !extra_columns.contains(&name.as_str()) && !T::COLUMNS.contains(&name.as_str()) {
                extra_columns.push(name);
            }
        }
    }

    let mut header: Vec<&str> = T::COLUMNS.to_vec();
    header.extend(extra_columns.iter().copied());

    let rows = records.iter().map(|record| {
        let mut row = record.to_row();
        for column in &extra_columns {
            let value = record
                .extra()
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            row.push(value);
        }
        row
    });

    write_atomic(path, &header, rows)
}

fn write_atomic(
    path: &Path,
    header: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<(), TradestoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
        wtr.write_record(header)?;
        for row in rows {
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TradestoreError::Io(e.error))?;
    Ok(())
}

pub fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Dated files `YYYY-MM-DD_<strategy>.csv` in `dir`, newest first, at most
/// `depth` of them. A missing directory has no files.
pub fn latest_dated_files(
    dir: &Path,
    strategy: &str,
    depth: usize,
) -> Result<Vec<(NaiveDate, PathBuf)>, TradestoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let suffix = format!("_{strategy}.csv");
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(prefix) = name.strip_suffix(&suffix) else {
            continue;
        };
        match NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            Ok(date) => found.push((date, entry.path())),
            Err(_) => debug!(file = %name, "ignoring file without a date prefix"),
        }
    }

    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.truncate(depth);
    Ok(found)
}

/// Parse one upstream strategy file into signal records.
pub fn load_raw_source(path: &Path, strategy: &str) -> Result<Loaded<SignalRecord>, TradestoreError> {
    let dataset = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| strategy.to_string());

    read_rows(path, &dataset, raw_signal::REQUIRED_COLUMNS, |row| {
        let cells = RawCells {
            signal: row.cell(raw_signal::SIGNAL_COLUMN).unwrap_or_default(),
            exit: row.cell(raw_signal::EXIT_COLUMN).unwrap_or_default(),
            win_rate: row.cell(raw_signal::WIN_RATE_COLUMN).unwrap_or_default(),
            interval: row.cell(raw_signal::INTERVAL_COLUMN).unwrap_or_default(),
            today: row.cell(raw_signal::TODAY_COLUMN),
            cagr: row.cell(raw_signal::CAGR_COLUMN),
            sharpe: row.cell(raw_signal::SHARPE_COLUMN),
            trend: row.cell(raw_signal::TREND_COLUMN),
            pe_ratio: row.cell(raw_signal::PE_COLUMN),
            industry_pe: row.cell(raw_signal::INDUSTRY_PE_COLUMN),
            last_quarter_profit: row.cell(raw_signal::LAST_QUARTER_COLUMN),
            last_year_same_quarter_profit: row.cell(raw_signal::LAST_YEAR_QUARTER_COLUMN),
        };
        raw_signal::build_record(strategy, &cells)
    })
}
