//! tradestore: consolidation, classification and reconciliation of trading
//! signals.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], stage orchestration in
//! [`pipeline`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod pipeline;
pub mod cli;
