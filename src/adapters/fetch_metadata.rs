//! The `data_fetch_datetime.json` record.

use crate::domain::error::TradestoreError;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub const FILE_NAME: &str = "data_fetch_datetime.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// `YYYY-MM-DD HH:MM:SS`.
    pub datetime: String,
    pub timezone: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl FetchMetadata {
    pub fn new(at: NaiveDateTime, timezone: &str) -> Self {
        FetchMetadata {
            datetime: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            timezone: timezone.to_string(),
            date: at.date().format("%Y-%m-%d").to_string(),
        }
    }

    /// `date`, or the date part of `datetime` when `date` is blank or invalid.
    pub fn fetch_date(&self) -> Option<NaiveDate> {
        [self.date.as_str(), self.datetime.as_str()]
            .into_iter()
            .filter_map(|s| s.trim().get(..10))
            .find_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }
}

pub fn read(path: &Path) -> Result<FetchMetadata, TradestoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write(path: &Path, metadata: &FetchMetadata) -> Result<(), TradestoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), metadata)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| TradestoreError::Io(e.error))?;
    Ok(())
}

/// The date the classifier measures recency against: the recorded fetch
/// date, else today's local date.
pub fn fetch_date_or_today(path: &Path) -> NaiveDate {
    match read(path).map(|m| m.fetch_date()) {
        Ok(Some(date)) => date,
        Ok(None) => {
            debug!(path = %path.display(), "fetch metadata carries no date, using today");
            Local::now().date_naive()
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no fetch metadata, using today");
            Local::now().date_naive()
        }
    }
}
