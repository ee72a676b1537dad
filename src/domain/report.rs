//! Structured per-stage results.
//!
//! Row- and symbol-level failures never abort a stage; they are collected
//! here so callers and tests can inspect exactly what was absorbed.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Consolidate,
    Classify,
    Reconcile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Consolidate => "consolidate",
            Stage::Classify => "classify",
            Stage::Reconcile => "reconcile",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Fundamentals,
    Price,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    SourceMissing { path: PathBuf },
    MalformedRow { dataset: String, line: u64, reason: String },
    LookupMiss { symbol: String, kind: LookupKind },
    UnmatchedPosition { dataset: String, key: String },
    /// The price service could not be reached; prices were left as they were.
    PricesStale { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Clean,
    CompletedWithIssues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    /// Dataset name → number of records persisted.
    pub written: Vec<(String, usize)>,
    pub issues: Vec<Issue>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        StageReport {
            stage,
            written: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn status(&self) -> StageStatus {
        if self.issues.is_empty() {
            StageStatus::Clean
        } else {
            StageStatus::CompletedWithIssues
        }
    }

    pub fn record_written(&mut self, dataset: &str, count: usize) {
        self.written.push((dataset.to_string(), count));
    }

    pub fn written_for(&self, dataset: &str) -> Option<usize> {
        self.written
            .iter()
            .find(|(name, _)| name == dataset)
            .map(|(_, n)| *n)
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn skipped_rows(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, Issue::MalformedRow { .. }))
            .count()
    }

    pub fn missing_sources(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, Issue::SourceMissing { .. }))
            .count()
    }

    pub fn lookup_misses(&self, kind: LookupKind) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|i| match i {
                Issue::LookupMiss { symbol, kind: k } if *k == kind => Some(symbol.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn unmatched_positions(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, Issue::UnmatchedPosition { .. }))
            .count()
    }

    pub fn prices_stale(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, Issue::PricesStale { .. }))
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.stage)?;
        for (dataset, n) in &self.written {
            write!(f, " {dataset}={n}")?;
        }
        write!(
            f,
            " (skipped rows {}, missing sources {}, fundamentals misses {}, stale prices {}, unmatched positions {})",
            self.skipped_rows(),
            self.missing_sources(),
            self.lookup_misses(LookupKind::Fundamentals).len(),
            self.lookup_misses(LookupKind::Price).len(),
            self.unmatched_positions()
        )?;
        if self.prices_stale() {
            write!(f, " [price service unavailable]")?;
        }
        Ok(())
    }
}
