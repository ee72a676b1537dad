//! Fundamentals lookup port trait.

use crate::domain::error::TradestoreError;
use crate::domain::signal::Fundamentals;

pub trait FundamentalsPort {
    /// `Ok(None)` is a lookup miss for this symbol. `Err` means the source
    /// itself could not be consulted.
    fn lookup_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>, TradestoreError>;
}
