//! Parsing of the upstream per-strategy signal files.
//!
//! The upstream job packs several values into one human-readable cell, e.g.
//! `HCLTECH.NS, Long, 2026-02-09 (Price: 1597.5)`. The helpers here pull the
//! typed values back out; [`build_record`] turns one row into a
//! [`SignalRecord`].

use crate::domain::signal::{Direction, ExitStatus, Fundamentals, SignalRecord, TrendPulse};
use chrono::NaiveDate;

pub const SIGNAL_COLUMN: &str = "Symbol, Signal, Signal Date/Price[$]";
pub const EXIT_COLUMN: &str = "Exit Signal Date/Price[$]";
pub const WIN_RATE_COLUMN: &str = "Win Rate [%], History Tested, Number of Trades";
pub const INTERVAL_COLUMN: &str = "Interval, Confirmation Status";
pub const TODAY_COLUMN: &str = "Today Trading Date/Price[$], Today price vs Signal";
pub const CAGR_COLUMN: &str = "Backtested Strategy CAGR [%]";
pub const SHARPE_COLUMN: &str = "Backtested Strategy Sharpe Ratio";
pub const TREND_COLUMN: &str = "TrendPulse Start/End (Date and Price($))";
pub const PE_COLUMN: &str = "PE_Ratio";
pub const INDUSTRY_PE_COLUMN: &str = "Industry_PE";
pub const LAST_QUARTER_COLUMN: &str = "Last_Quarter_Profit";
pub const LAST_YEAR_QUARTER_COLUMN: &str = "Last_Year_Same_Quarter_Profit";

pub const REQUIRED_COLUMNS: &[&str] = &[
    SIGNAL_COLUMN,
    EXIT_COLUMN,
    WIN_RATE_COLUMN,
    INTERVAL_COLUMN,
];

/// Cell values of one upstream row, looked up by column name.
#[derive(Debug, Default, Clone)]
pub struct RawCells<'a> {
    pub signal: &'a str,
    pub exit: &'a str,
    pub win_rate: &'a str,
    pub interval: &'a str,
    pub today: Option<&'a str>,
    pub cagr: Option<&'a str>,
    pub sharpe: Option<&'a str>,
    pub trend: Option<&'a str>,
    pub pe_ratio: Option<&'a str>,
    pub industry_pe: Option<&'a str>,
    pub last_quarter_profit: Option<&'a str>,
    pub last_year_same_quarter_profit: Option<&'a str>,
}

pub fn build_record(strategy: &str, cells: &RawCells<'_>) -> Result<SignalRecord, String> {
    let (symbol, direction, signal_date, signal_price) = parse_signal_column(cells.signal)
        .ok_or_else(|| format!("unparseable signal cell '{}'", cells.signal))?;

    let (win_rate, trade_count) = parse_win_rate_and_trades(cells.win_rate);
    let (win_rate, trade_count) = match (win_rate, trade_count) {
        (Some(w), Some(t)) => (w, t),
        _ => return Err(format!("unparseable win rate cell '{}'", cells.win_rate)),
    };

    let interval = parse_interval(cells.interval);
    if interval.is_empty() {
        return Err("empty interval".to_string());
    }

    let (exit_status, exit_date, exit_price) = parse_exit(cells.exit);

    Ok(SignalRecord {
        symbol,
        signal_date,
        strategy: strategy.to_string(),
        interval,
        direction,
        signal_price,
        win_rate: Some(win_rate),
        trade_count: Some(trade_count),
        exit_status,
        exit_date,
        exit_price,
        fundamentals: Fundamentals {
            pe_ratio: cells.pe_ratio.and_then(parse_number),
            industry_pe: cells.industry_pe.and_then(parse_number),
            last_quarter_profit: cells.last_quarter_profit.and_then(parse_number),
            last_year_same_quarter_profit: cells
                .last_year_same_quarter_profit
                .and_then(parse_number),
        },
        trend: cells.trend.and_then(parse_trend_pulse),
        today_price: cells.today.and_then(|t| prices(t).first().copied()),
        strategy_cagr: cells.cagr.and_then(parse_number),
        strategy_sharpe: cells.sharpe.and_then(parse_number),
    })
}

/// `"HCLTECH.NS, Long, 2026-02-09 (Price: 1597.5)"` → symbol, direction, date, price.
pub fn parse_signal_column(value: &str) -> Option<(String, Direction, NaiveDate, f64)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    let symbol = parts[0].trim_matches('"').trim();
    if symbol.is_empty() {
        return None;
    }
    let direction = Direction::parse(parts[1]);
    let rest = parts[2..].join(",");
    let date = first_date(&rest)?;
    let price = prices(&rest).first().copied()?;
    Some((symbol.to_string(), direction, date, price))
}

/// `"92.31%, Past 4 years, 13"` → (92.31, 13).
pub fn parse_win_rate_and_trades(value: &str) -> (Option<f64>, Option<u32>) {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return (None, None);
    }
    let win_rate = parts[0].trim_end_matches('%').trim().parse::<f64>().ok();
    let trades = parts[parts.len() - 1]
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|digits| digits.parse::<u32>().ok());
    (win_rate, trades)
}

/// `"Daily, is CONFIRMED on 2026-02-09"` → `"Daily"`.
pub fn parse_interval(value: &str) -> String {
    value
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches('"')
        .to_string()
}

/// Exit descriptor → status plus the date and price it names, if any.
pub fn parse_exit(value: &str) -> (ExitStatus, Option<NaiveDate>, Option<f64>) {
    let status = ExitStatus::parse(value);
    match &status {
        ExitStatus::NoExitYet => (status, None, None),
        ExitStatus::Exited(raw) => {
            let date = first_date(raw);
            let price = prices(raw).first().copied();
            (status, date, price)
        }
    }
}

/// `"2025-12-18 (Price: 200.9)/2026-02-09 (Price: 169.4)"` → start/end prices.
pub fn parse_trend_pulse(value: &str) -> Option<TrendPulse> {
    let found = prices(value);
    if found.len() < 2 {
        return None;
    }
    TrendPulse::from_parts(Some(found[0]), Some(found[1]))
}

/// Lenient numeric cell: tolerates a trailing `%`; "No Data", "N/A" and the
/// like become `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_end_matches('%').trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// First `YYYY-MM-DD` substring that is a valid calendar date.
pub fn first_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    (0..=bytes.len() - 10).find_map(|i| {
        let window = &bytes[i..i + 10];
        let shaped = window.iter().enumerate().all(|(j, b)| match j {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !shaped {
            return None;
        }
        std::str::from_utf8(window)
            .ok()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    })
}

/// Every number following a `Price:` marker, in order of appearance.
pub fn prices(value: &str) -> Vec<f64> {
    value
        .split("Price:")
        .skip(1)
        .filter_map(|chunk| {
            let digits: String = chunk
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().ok()
        })
        .collect()
}
