//! Core domain types and logic.

pub mod signal;
pub mod raw_signal;
pub mod enrich;
pub mod price_refresh;
pub mod consolidate;
pub mod classify;
pub mod position;
pub mod reconcile;
pub mod report;
pub mod settings;
pub mod error;
