//! Column layouts of the persisted datasets.

use crate::adapters::csv_store::{fmt_date, fmt_opt, Row, Tabular};
use crate::domain::classify::{Candidate, CandidateKind};
use crate::domain::position::{PositionOwned, PositionRecord};
use crate::domain::raw_signal;
use crate::domain::signal::{
    Direction, ExitStatus, Fundamentals, SignalRecord, SignalUpdate, TrendPulse,
};

pub const ALL_SIGNALS: &str = "all_signals";
pub const POTENTIAL_ENTRY: &str = "potential_entry";
pub const POTENTIAL_EXIT: &str = "potential_exit";

const SIGNAL_REQUIRED: &[&str] = &[
    "Symbol",
    "Signal_Type",
    "Signal_Date",
    "Signal_Price",
    "Function",
    "Interval",
    "Exit_Signal_Raw",
];

const POSITION_REQUIRED: &[&str] = &["Symbol", "Signal_Date", "Function", "Interval"];

/// Signal-derived cells shared by every signal-shaped dataset.
fn read_update(row: &Row<'_>) -> Result<SignalUpdate, String> {
    let exit_status = ExitStatus::parse(row.cell("Exit_Signal_Raw").unwrap_or_default());
    let (_, raw_exit_date, raw_exit_price) = raw_signal::parse_exit(exit_status.as_str());
    let (exit_date, exit_price) = if exit_status.has_exited() {
        (
            row.date("Exit_Date")?.or(raw_exit_date),
            row.number("Exit_Price")?.or(raw_exit_price),
        )
    } else {
        (None, None)
    };

    Ok(SignalUpdate {
        win_rate: row.number("Win_Rate")?,
        trade_count: row.parse("Number_Of_Trades")?,
        strategy_cagr: row.number("Strategy_CAGR")?,
        strategy_sharpe: row.number("Strategy_Sharpe")?,
        fundamentals: Fundamentals {
            pe_ratio: row.number("PE_Ratio")?,
            industry_pe: row.number("Industry_PE")?,
            last_quarter_profit: row.number("Last_Quarter_Profit")?,
            last_year_same_quarter_profit: row.number("Last_Year_Same_Quarter_Profit")?,
        },
        exit_status,
        exit_date,
        exit_price,
        trend: TrendPulse::from_parts(
            row.number("TrendPulse_Start_Price")?,
            row.number("TrendPulse_End_Price")?,
        ),
        today_price: row.number("Today_Price")?,
    })
}

fn read_signal(row: &Row<'_>) -> Result<SignalRecord, String> {
    let symbol = row.required("Symbol")?.to_string();
    let signal_date = row.date("Signal_Date")?.ok_or("empty Signal_Date")?;
    let signal_price = row.number("Signal_Price")?.ok_or("empty Signal_Price")?;
    let strategy = row.required("Function")?.to_string();
    let interval = row.required("Interval")?.to_string();
    let direction = Direction::parse(row.cell("Signal_Type").unwrap_or_default());
    let u = read_update(row)?;

    Ok(SignalRecord {
        symbol,
        signal_date,
        strategy,
        interval,
        direction,
        signal_price,
        win_rate: u.win_rate,
        trade_count: u.trade_count,
        exit_status: u.exit_status,
        exit_date: u.exit_date,
        exit_price: u.exit_price,
        fundamentals: u.fundamentals,
        trend: u.trend,
        today_price: u.today_price,
        strategy_cagr: u.strategy_cagr,
        strategy_sharpe: u.strategy_sharpe,
    })
}

fn write_signal(r: &SignalRecord) -> Vec<String> {
    vec![
        r.symbol.clone(),
        r.direction.as_str().to_string(),
        fmt_date(r.signal_date),
        r.signal_price.to_string(),
        fmt_opt(r.win_rate),
        fmt_opt(r.trade_count),
        fmt_opt(r.today_price),
        r.exit_status.as_str().to_string(),
        r.strategy.clone(),
        r.interval.clone(),
        fmt_opt(r.fundamentals.pe_ratio),
        fmt_opt(r.fundamentals.industry_pe),
        fmt_opt(r.fundamentals.last_quarter_profit),
        fmt_opt(r.fundamentals.last_year_same_quarter_profit),
        fmt_opt(r.strategy_cagr),
        fmt_opt(r.strategy_sharpe),
        fmt_opt(r.trend.map(|t| t.start_price)),
        fmt_opt(r.trend.map(|t| t.end_price)),
        fmt_opt(r.exit_date.map(fmt_date)),
        fmt_opt(r.exit_price),
        r.key().to_string(),
    ]
}

impl Tabular for SignalRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Symbol",
        "Signal_Type",
        "Signal_Date",
        "Signal_Price",
        "Win_Rate",
        "Number_Of_Trades",
        "Today_Price",
        "Exit_Signal_Raw",
        "Function",
        "Interval",
        "PE_Ratio",
        "Industry_PE",
        "Last_Quarter_Profit",
        "Last_Year_Same_Quarter_Profit",
        "Strategy_CAGR",
        "Strategy_Sharpe",
        "TrendPulse_Start_Price",
        "TrendPulse_End_Price",
        "Exit_Date",
        "Exit_Price",
        "Dedup_Key",
    ];
    const REQUIRED: &'static [&'static str] = SIGNAL_REQUIRED;

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        read_signal(row)
    }

    fn to_row(&self) -> Vec<String> {
        write_signal(self)
    }
}

/// A row of `potential_entry`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow(pub Candidate);

/// A row of `potential_exit`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitRow(pub Candidate);

impl Tabular for EntryRow {
    const COLUMNS: &'static [&'static str] = &[
        "Symbol",
        "Signal_Type",
        "Signal_Date",
        "Signal_Price",
        "Win_Rate",
        "Number_Of_Trades",
        "Today_Price",
        "Exit_Signal_Raw",
        "Function",
        "Interval",
        "PE_Ratio",
        "Industry_PE",
        "Last_Quarter_Profit",
        "Last_Year_Same_Quarter_Profit",
        "Strategy_CAGR",
        "Strategy_Sharpe",
        "TrendPulse_Start_Price",
        "TrendPulse_End_Price",
        "Exit_Date",
        "Exit_Price",
        "Dedup_Key",
        "Today_vs_Signal_Pct",
    ];
    const REQUIRED: &'static [&'static str] = SIGNAL_REQUIRED;

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        Ok(EntryRow(Candidate {
            kind: CandidateKind::Entry,
            signal: read_signal(row)?,
            price_change_pct: row.number("Today_vs_Signal_Pct")?,
            days_since_exit: None,
        }))
    }

    fn to_row(&self) -> Vec<String> {
        let mut row = write_signal(&self.0.signal);
        row.push(fmt_opt(self.0.price_change_pct.map(|p| format!("{p:.2}"))));
        row
    }
}

impl Tabular for ExitRow {
    const COLUMNS: &'static [&'static str] = &[
        "Symbol",
        "Signal_Type",
        "Signal_Date",
        "Signal_Price",
        "Win_Rate",
        "Number_Of_Trades",
        "Today_Price",
        "Exit_Signal_Raw",
        "Function",
        "Interval",
        "PE_Ratio",
        "Industry_PE",
        "Last_Quarter_Profit",
        "Last_Year_Same_Quarter_Profit",
        "Strategy_CAGR",
        "Strategy_Sharpe",
        "TrendPulse_Start_Price",
        "TrendPulse_End_Price",
        "Exit_Date",
        "Exit_Price",
        "Dedup_Key",
        "Days_Since_Exit",
    ];
    const REQUIRED: &'static [&'static str] = SIGNAL_REQUIRED;

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        Ok(ExitRow(Candidate {
            kind: CandidateKind::Exit,
            signal: read_signal(row)?,
            price_change_pct: None,
            days_since_exit: row.parse("Days_Since_Exit")?,
        }))
    }

    fn to_row(&self) -> Vec<String> {
        let mut row = write_signal(&self.0.signal);
        row.push(fmt_opt(self.0.days_since_exit));
        row
    }
}

impl Tabular for PositionRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Symbol",
        "Signal_Type",
        "Signal_Date",
        "Signal_Price",
        "Function",
        "Interval",
        "Entry_Date",
        "Entry_Price",
        "Quantity",
        "Win_Rate",
        "Number_Of_Trades",
        "Strategy_CAGR",
        "Strategy_Sharpe",
        "PE_Ratio",
        "Industry_PE",
        "Last_Quarter_Profit",
        "Last_Year_Same_Quarter_Profit",
        "TrendPulse_Start_Price",
        "TrendPulse_End_Price",
        "Exit_Signal_Raw",
        "Exit_Date",
        "Exit_Price",
        "Today_Price",
        "Current_MTM",
        "Unrealized_PnL",
    ];
    const REQUIRED: &'static [&'static str] = POSITION_REQUIRED;

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        let owned = PositionOwned {
            symbol: row.required("Symbol")?.to_string(),
            signal_date: row.date("Signal_Date")?.ok_or("empty Signal_Date")?,
            strategy: row.required("Function")?.to_string(),
            interval: row.required("Interval")?.to_string(),
            direction: Direction::parse(row.cell("Signal_Type").unwrap_or_default()),
            signal_price: row.number("Signal_Price")?,
            entry_date: row.date("Entry_Date")?,
            entry_price: row.number("Entry_Price")?,
            quantity: row.parse("Quantity")?,
        };
        Ok(PositionRecord {
            owned,
            signal: read_update(row)?,
            extra: row.unknown_cells(Self::COLUMNS),
        })
    }

    fn to_row(&self) -> Vec<String> {
        let o = &self.owned;
        let s = &self.signal;
        vec![
            o.symbol.clone(),
            o.direction.as_str().to_string(),
            fmt_date(o.signal_date),
            fmt_opt(o.signal_price),
            o.strategy.clone(),
            o.interval.clone(),
            fmt_opt(o.entry_date.map(fmt_date)),
            fmt_opt(o.entry_price),
            fmt_opt(o.quantity),
            fmt_opt(s.win_rate),
            fmt_opt(s.trade_count),
            fmt_opt(s.strategy_cagr),
            fmt_opt(s.strategy_sharpe),
            fmt_opt(s.fundamentals.pe_ratio),
            fmt_opt(s.fundamentals.industry_pe),
            fmt_opt(s.fundamentals.last_quarter_profit),
            fmt_opt(s.fundamentals.last_year_same_quarter_profit),
            fmt_opt(s.trend.map(|t| t.start_price)),
            fmt_opt(s.trend.map(|t| t.end_price)),
            s.exit_status.as_str().to_string(),
            fmt_opt(s.exit_date.map(fmt_date)),
            fmt_opt(s.exit_price),
            fmt_opt(s.today_price),
            fmt_opt(self.mark_to_market_pct().map(|p| format!("{p:.2}"))),
            fmt_opt(self.unrealized_pnl().map(|p| format!("{p:.2}"))),
        ]
    }

    fn extra(&self) -> &[(String, String)] {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::csv_store::{load, save};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn signal() -> SignalRecord {
        SignalRecord {
            symbol: "TCS.NS".into(),
            signal_date: date(2026, 2, 9),
            strategy: "Trendline".into(),
            interval: "Weekly".into(),
            direction: Direction::Long,
            signal_price: 3999.95,
            win_rate: Some(85.71),
            trade_count: Some(7),
            exit_status: ExitStatus::Exited("2026-02-11 (Price: 4100.5)".into()),
            exit_date: Some(date(2026, 2, 11)),
            exit_price: Some(4100.5),
            fundamentals: Fundamentals {
                pe_ratio: Some(28.1),
                industry_pe: Some(31.0),
                last_quarter_profit: None,
                last_year_same_quarter_profit: Some(-12.5),
            },
            trend: Some(TrendPulse {
                start_price: 4200.0,
                end_price: 3950.0,
            }),
            today_price: Some(4010.0),
            strategy_cagr: Some(18.2),
            strategy_sharpe: None,
        }
    }

    #[test]
    fn signal_rows_reload_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all_signals.csv");
        save(&path, &[signal()]).unwrap();

        let loaded = load::<SignalRecord>(&path, ALL_SIGNALS).unwrap();
        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.records, vec![signal()]);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("TCS.NS|2026-02-09|Trendline|Weekly"));
    }

    #[test]
    fn exit_fields_fall_back_to_raw_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all_signals.csv");
        fs::write(
            &path,
            "Symbol,Signal_Type,Signal_Date,Signal_Price,Function,Interval,Exit_Signal_Raw\n\
             A.NS,Long,2026-02-02,10,Distance,Daily,2026-02-05 (Price: 12.5)\n\
             B.NS,Long,2026-02-02,10,Distance,Daily,No Exit Yet\n",
        )
        .unwrap();
        let loaded = load::<SignalRecord>(&path, ALL_SIGNALS).unwrap();
        assert_eq!(loaded.records[0].exit_date, Some(date(2026, 2, 5)));
        assert_eq!(loaded.records[0].exit_price, Some(12.5));
        assert_eq!(loaded.records[1].exit_status, ExitStatus::NoExitYet);
        assert_eq!(loaded.records[1].exit_date, None);
    }

    #[test]
    fn dedup_key_column_is_not_trusted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all_signals.csv");
        fs::write(
            &path,
            "Symbol,Signal_Type,Signal_Date,Signal_Price,Function,Interval,Exit_Signal_Raw,Dedup_Key\n\
             A.NS,Long,2026-02-02,10,Distance,Daily,No Exit Yet,bogus\n",
        )
        .unwrap();
        let loaded = load::<SignalRecord>(&path, ALL_SIGNALS).unwrap();
        assert_eq!(
            loaded.records[0].key().to_string(),
            "A.NS|2026-02-02|Distance|Daily"
        );
    }

    #[test]
    fn entry_row_appends_price_change() {
        let mut sig = signal();
        sig.exit_status = ExitStatus::NoExitYet;
        sig.exit_date = None;
        sig.exit_price = None;
        let row = EntryRow(Candidate {
            kind: CandidateKind::Entry,
            signal: sig,
            price_change_pct: Some(0.25),
            days_since_exit: None,
        });
        let cells = row.to_row();
        assert_eq!(cells.len(), EntryRow::COLUMNS.len());
        assert_eq!(cells.last().unwrap(), "0.25");
    }

    #[test]
    fn position_rows_keep_unknown_columns_and_compute_mtm() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades_bought.csv");
        fs::write(
            &path,
            "Symbol,Signal_Date,Function,Interval,Entry_Date,Entry_Price,Quantity,Notes,Today_Price,Current_MTM\n\
             TCS.NS,2026-02-02,Distance,Daily,2026-02-03,50,100,core holding,55,999\n",
        )
        .unwrap();

        let loaded = load::<PositionRecord>(&path, "trades_bought").unwrap();
        let pos = &loaded.records[0];
        assert_eq!(pos.owned.quantity, Some(100));
        assert_eq!(pos.extra, vec![("Notes".to_string(), "core holding".to_string())]);

        save(&path, &loaded.records).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.ends_with("Current_MTM,Unrealized_PnL,Notes"));
        let row = lines.next().unwrap();
        assert!(row.ends_with("10.00,500.00,core holding"), "{row}");
    }

    #[test]
    fn position_missing_identity_column_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitored_trades.csv");
        fs::write(&path, "Symbol,Signal_Date,Function\nA,2026-02-02,Distance\n").unwrap();
        assert!(load::<PositionRecord>(&path, "monitored_trades").is_err());
    }
}
