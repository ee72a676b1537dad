//! Signal records and their identity.

use chrono::NaiveDate;
use std::fmt;

/// Text the upstream job writes while a signal is still open.
pub const NO_EXIT_YET: &str = "No Exit Yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Anything mentioning "short" is a short signal; everything else is long.
    pub fn parse(raw: &str) -> Self {
        if raw.to_lowercase().contains("short") {
            Direction::Short
        } else {
            Direction::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitStatus {
    NoExitYet,
    /// The exit descriptor as published, e.g. `2026-02-11 (Price: 1650.0)`.
    Exited(String),
}

impl ExitStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.to_lowercase().contains("no exit yet") {
            ExitStatus::NoExitYet
        } else {
            ExitStatus::Exited(trimmed.to_string())
        }
    }

    pub fn has_exited(&self) -> bool {
        matches!(self, ExitStatus::Exited(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExitStatus::NoExitYet => NO_EXIT_YET,
            ExitStatus::Exited(raw) => raw,
        }
    }
}

/// Unique identity of a signal: `(symbol, signal_date, strategy, interval)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalKey {
    pub symbol: String,
    pub signal_date: NaiveDate,
    pub strategy: String,
    pub interval: String,
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.symbol,
            self.signal_date.format("%Y-%m-%d"),
            self.strategy,
            self.interval
        )
    }
}

/// Start/end price pair published by trend-based strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPulse {
    pub start_price: f64,
    pub end_price: f64,
}

impl TrendPulse {
    /// Both halves must be present for the pair to exist.
    pub fn from_parts(start: Option<f64>, end: Option<f64>) -> Option<Self> {
        match (start, end) {
            (Some(start_price), Some(end_price)) => Some(TrendPulse {
                start_price,
                end_price,
            }),
            _ => None,
        }
    }

    pub fn is_declining(&self) -> bool {
        self.start_price > self.end_price
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub industry_pe: Option<f64>,
    pub last_quarter_profit: Option<f64>,
    pub last_year_same_quarter_profit: Option<f64>,
}

impl Fundamentals {
    pub fn is_empty(&self) -> bool {
        *self == Fundamentals::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub symbol: String,
    pub signal_date: NaiveDate,
    pub strategy: String,
    pub interval: String,
    pub direction: Direction,
    pub signal_price: f64,
    pub win_rate: Option<f64>,
    pub trade_count: Option<u32>,
    pub exit_status: ExitStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    pub fundamentals: Fundamentals,
    pub trend: Option<TrendPulse>,
    pub today_price: Option<f64>,
    pub strategy_cagr: Option<f64>,
    pub strategy_sharpe: Option<f64>,
}

impl SignalRecord {
    pub fn key(&self) -> SignalKey {
        SignalKey {
            symbol: self.symbol.clone(),
            signal_date: self.signal_date,
            strategy: self.strategy.clone(),
            interval: self.interval.clone(),
        }
    }

    /// The fields a position takes over from its signal on reconciliation.
    pub fn update(&self) -> SignalUpdate {
        SignalUpdate {
            win_rate: self.win_rate,
            trade_count: self.trade_count,
            strategy_cagr: self.strategy_cagr,
            strategy_sharpe: self.strategy_sharpe,
            fundamentals: self.fundamentals,
            exit_status: self.exit_status.clone(),
            exit_date: self.exit_date,
            exit_price: self.exit_price,
            trend: self.trend,
            today_price: self.today_price,
        }
    }

    /// Signed move of `today_price` relative to `signal_price`, as a fraction.
    pub fn price_change(&self) -> Option<f64> {
        let today = self.today_price?;
        if self.signal_price <= 0.0 {
            return None;
        }
        Some((today - self.signal_price) / self.signal_price)
    }
}

/// Signal-derived projection of a record. This is everything reconciliation
/// may overwrite on a position; identity and position-owned fields are not
/// reachable from here.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalUpdate {
    pub win_rate: Option<f64>,
    pub trade_count: Option<u32>,
    pub strategy_cagr: Option<f64>,
    pub strategy_sharpe: Option<f64>,
    pub fundamentals: Fundamentals,
    pub exit_status: ExitStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    pub trend: Option<TrendPulse>,
    pub today_price: Option<f64>,
}

impl Default for SignalUpdate {
    fn default() -> Self {
        SignalUpdate {
            win_rate: None,
            trade_count: None,
            strategy_cagr: None,
            strategy_sharpe: None,
            fundamentals: Fundamentals::default(),
            exit_status: ExitStatus::NoExitYet,
            exit_date: None,
            exit_price: None,
            trend: None,
            today_price: None,
        }
    }
}
