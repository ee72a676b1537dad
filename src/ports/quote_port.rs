//! Latest-price lookup port trait.

use crate::domain::error::TradestoreError;

/// Why a single symbol's price could not be resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    #[error("no price for {symbol}")]
    NotFound { symbol: String },

    #[error("bad price data for {symbol}: {reason}")]
    BadData { symbol: String, reason: String },

    #[error("timed out fetching {symbol}")]
    Timeout { symbol: String },

    /// The request never reached a usable answer (connection refused, DNS, ...).
    #[error("transport error for {symbol}: {reason}")]
    Transport { symbol: String, reason: String },
}

impl QuoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, QuoteError::Transport { .. } | QuoteError::Timeout { .. })
    }
}

/// Implementations are shared across the refresher's worker threads.
pub trait QuotePort: Send + Sync {
    /// Name used in logs and `ServiceUnavailable` errors.
    fn name(&self) -> &str;

    /// Cheap check that the capability can be reached at all.
    fn ensure_available(&self) -> Result<(), TradestoreError>;

    /// Latest price for one symbol. Must return within the adapter's timeout.
    fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError>;
}
