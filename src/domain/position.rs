//! Monitored and bought positions.
//!
//! A position splits into two disjoint groups: [`PositionOwned`] is set when
//! the user opens the position and reconciliation never touches it;
//! [`SignalUpdate`] mirrors the signal the position was opened against and is
//! overwritten whenever that signal is found again.

use crate::domain::signal::{Direction, SignalKey, SignalUpdate};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionBook {
    Monitored,
    Bought,
}

impl PositionBook {
    pub fn dataset(&self) -> &'static str {
        match self {
            PositionBook::Monitored => "monitored_trades",
            PositionBook::Bought => "trades_bought",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionOwned {
    pub symbol: String,
    pub signal_date: NaiveDate,
    pub strategy: String,
    pub interval: String,
    pub direction: Direction,
    pub signal_price: Option<f64>,
    pub entry_date: Option<NaiveDate>,
    pub entry_price: Option<f64>,
    /// Shares held; bought positions only.
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub owned: PositionOwned,
    pub signal: SignalUpdate,
    /// Columns the store does not model, kept verbatim in file order.
    pub extra: Vec<(String, String)>,
}

impl PositionRecord {
    pub fn new(owned: PositionOwned) -> Self {
        PositionRecord {
            owned,
            signal: SignalUpdate::default(),
            extra: Vec::new(),
        }
    }

    pub fn key(&self) -> SignalKey {
        SignalKey {
            symbol: self.owned.symbol.clone(),
            signal_date: self.owned.signal_date,
            strategy: self.owned.strategy.clone(),
            interval: self.owned.interval.clone(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.owned.symbol
    }

    pub fn today_price(&self) -> Option<f64> {
        self.signal.today_price
    }

    /// Take over the latest signal-derived values. A signal without a today
    /// price does not erase the one already held.
    pub fn absorb(&mut self, update: SignalUpdate) {
        let previous_price = self.signal.today_price;
        self.signal = update;
        if self.signal.today_price.is_none() {
            self.signal.today_price = previous_price;
        }
    }

    pub fn set_today_price(&mut self, price: f64) {
        self.signal.today_price = Some(price);
    }

    /// Price the position is marked against: the entry price, or the signal
    /// price when no entry was recorded.
    pub fn reference_price(&self) -> Option<f64> {
        self.owned.entry_price.or(self.owned.signal_price)
    }

    /// Percent move of today's price from the reference price, signed so a
    /// gain is positive for either direction.
    pub fn mark_to_market_pct(&self) -> Option<f64> {
        let reference = self.reference_price().filter(|p| *p > 0.0)?;
        let today = self.today_price()?;
        let pct = (today - reference) / reference * 100.0;
        Some(match self.owned.direction {
            Direction::Long => pct,
            Direction::Short => -pct,
        })
    }

    pub fn market_value(&self) -> Option<f64> {
        Some(self.owned.quantity?.unsigned_abs() as f64 * self.today_price()?)
    }

    pub fn unrealized_pnl(&self) -> Option<f64> {
        let quantity = self.owned.quantity? as f64;
        let reference = self.reference_price()?;
        let move_ = self.today_price()? - reference;
        Some(match self.owned.direction {
            Direction::Long => quantity * move_,
            Direction::Short => -quantity * move_,
        })
    }
}
