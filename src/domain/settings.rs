//! Typed settings and their validation.
//!
//! Every key has a default; validation only rejects values that are present
//! but out of range.

use crate::domain::classify::FilterConfig;
use crate::domain::error::TradestoreError;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceProvider {
    /// Per-symbol close files written by the upstream download job.
    StockData,
    /// Live quotes over HTTP.
    Yahoo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub stock_data_dir: PathBuf,
    pub fundamentals_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSettings {
    pub provider: PriceProvider,
    pub workers: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub paths: PathSettings,
    pub strategies: Vec<String>,
    pub history_depth: usize,
    pub filters: FilterConfig,
    pub prices: PriceSettings,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyListError {
    #[error("empty token in strategy list")]
    EmptyToken,

    #[error("duplicate strategy: {0}")]
    DuplicateStrategy(String),
}

pub fn parse_strategies(input: &str) -> Result<Vec<String>, StrategyListError> {
    let mut strategies = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(StrategyListError::EmptyToken);
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(StrategyListError::DuplicateStrategy(trimmed.to_string()));
        }
        strategies.push(trimmed.to_string());
    }

    Ok(strategies)
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, TradestoreError> {
    let paths = load_paths(config);
    let strategies = load_strategies(config)?;
    let history_depth = positive_int(config, "sources", "history_depth", 1)?;
    let filters = load_filters(config)?;
    let prices = load_prices(config)?;
    let timezone = config
        .get_string("metadata", "timezone")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "local".to_string());

    Ok(Settings {
        paths,
        strategies,
        history_depth,
        filters,
        prices,
        timezone,
    })
}

fn load_paths(config: &dyn ConfigPort) -> PathSettings {
    let data_dir = config
        .get_path("paths", "data_dir")
        .unwrap_or_else(|| PathBuf::from("trade_store/INDIA"));
    let stock_data_dir = config
        .get_path("paths", "stock_data_dir")
        .unwrap_or_else(|| PathBuf::from("stock_data/INDIA"));
    let fundamentals_file = config
        .get_path("paths", "fundamentals_file")
        .unwrap_or_else(|| data_dir.join("fundamentals.csv"));
    PathSettings {
        data_dir,
        stock_data_dir,
        fundamentals_file,
    }
}

fn load_strategies(config: &dyn ConfigPort) -> Result<Vec<String>, TradestoreError> {
    let raw = config
        .get_string("sources", "strategies")
        .unwrap_or_else(|| "Distance,Trendline".to_string());
    parse_strategies(&raw)
        .map_err(|e| TradestoreError::config_invalid("sources", "strategies", e.to_string()))
}

fn load_filters(config: &dyn ConfigPort) -> Result<FilterConfig, TradestoreError> {
    let defaults = FilterConfig::default();

    let min_win_rate = config.get_double("filters", "min_win_rate", defaults.min_win_rate);
    if !(0.0..=100.0).contains(&min_win_rate) {
        return Err(TradestoreError::config_invalid(
            "filters",
            "min_win_rate",
            "min_win_rate must be between 0 and 100",
        ));
    }

    let min_trades = config.get_int("filters", "min_trades", defaults.min_trades as i64);
    let min_trades = u32::try_from(min_trades).map_err(|_| {
        TradestoreError::config_invalid("filters", "min_trades", "min_trades must be non-negative")
    })?;

    let max_pe_ratio = config.get_double("filters", "max_pe_ratio", defaults.max_pe_ratio);
    if max_pe_ratio <= 0.0 {
        return Err(TradestoreError::config_invalid(
            "filters",
            "max_pe_ratio",
            "max_pe_ratio must be positive",
        ));
    }

    let profit_ratio = config.get_double("filters", "profit_ratio", defaults.profit_ratio);
    if profit_ratio < 0.0 {
        return Err(TradestoreError::config_invalid(
            "filters",
            "profit_ratio",
            "profit_ratio must be non-negative",
        ));
    }

    let band_below_pct = config.get_double("filters", "band_below_pct", defaults.band_below * 100.0);
    if band_below_pct > 0.0 {
        return Err(TradestoreError::config_invalid(
            "filters",
            "band_below_pct",
            "band_below_pct must be zero or negative",
        ));
    }
    let band_above_pct = config.get_double("filters", "band_above_pct", defaults.band_above * 100.0);
    if band_above_pct < 0.0 {
        return Err(TradestoreError::config_invalid(
            "filters",
            "band_above_pct",
            "band_above_pct must be zero or positive",
        ));
    }

    let exit_recency_days =
        config.get_int("filters", "exit_recency_days", defaults.exit_recency_days);
    if exit_recency_days < 0 {
        return Err(TradestoreError::config_invalid(
            "filters",
            "exit_recency_days",
            "exit_recency_days must be non-negative",
        ));
    }

    let entry_signal_recency_days = match config.get_int("filters", "entry_signal_recency_days", 0)
    {
        0 => None,
        days if days > 0 => Some(days),
        _ => {
            return Err(TradestoreError::config_invalid(
                "filters",
                "entry_signal_recency_days",
                "entry_signal_recency_days must be non-negative",
            ));
        }
    };

    Ok(FilterConfig {
        min_win_rate,
        min_trades,
        max_pe_ratio,
        profit_ratio,
        band_below: band_below_pct / 100.0,
        band_above: band_above_pct / 100.0,
        exit_recency_days,
        entry_signal_recency_days,
    })
}

fn load_prices(config: &dyn ConfigPort) -> Result<PriceSettings, TradestoreError> {
    let provider = match config
        .get_string("prices", "provider")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("stock_data") => PriceProvider::StockData,
        Some("yahoo") => PriceProvider::Yahoo,
        Some(other) => {
            return Err(TradestoreError::config_invalid(
                "prices",
                "provider",
                format!("unknown provider '{other}', expected stock_data or yahoo"),
            ));
        }
    };
    let workers = positive_int(config, "prices", "workers", 8)?;
    let timeout_secs = positive_int(config, "prices", "timeout_secs", 10)?;

    Ok(PriceSettings {
        provider,
        workers,
        timeout: Duration::from_secs(timeout_secs as u64),
    })
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, TradestoreError> {
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(TradestoreError::config_invalid(
            section,
            key,
            format!("{key} must be at least 1"),
        ));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            MapConfig(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn assert_invalid(result: Result<Settings, TradestoreError>, expected_key: &str) {
        match result {
            Err(TradestoreError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_gives_defaults() {
        let settings = load_settings(&MapConfig::new(&[])).unwrap();
        assert_eq!(settings.paths.data_dir, PathBuf::from("trade_store/INDIA"));
        assert_eq!(
            settings.paths.fundamentals_file,
            PathBuf::from("trade_store/INDIA/fundamentals.csv")
        );
        assert_eq!(settings.strategies, vec!["Distance", "Trendline"]);
        assert_eq!(settings.history_depth, 1);
        assert_eq!(settings.filters, FilterConfig::default());
        assert_eq!(settings.prices.provider, PriceProvider::StockData);
        assert_eq!(settings.prices.workers, 8);
        assert_eq!(settings.prices.timeout, Duration::from_secs(10));
        assert_eq!(settings.timezone, "local");
    }

    #[test]
    fn overrides_are_applied() {
        let config = MapConfig::new(&[
            ("paths", "data_dir", "/data"),
            ("sources", "strategies", "Trendline"),
            ("sources", "history_depth", "3"),
            ("filters", "min_win_rate", "75"),
            ("filters", "band_below_pct", "-2.5"),
            ("filters", "entry_signal_recency_days", "7"),
            ("prices", "provider", "Yahoo"),
            ("prices", "workers", "2"),
            ("metadata", "timezone", "IST"),
        ]);
        let settings = load_settings(&config).unwrap();
        assert_eq!(settings.paths.fundamentals_file, PathBuf::from("/data/fundamentals.csv"));
        assert_eq!(settings.strategies, vec!["Trendline"]);
        assert_eq!(settings.history_depth, 3);
        assert_eq!(settings.filters.min_win_rate, 75.0);
        assert!((settings.filters.band_below - (-0.025)).abs() < 1e-12);
        assert_eq!(settings.filters.entry_signal_recency_days, Some(7));
        assert_eq!(settings.prices.provider, PriceProvider::Yahoo);
        assert_eq!(settings.prices.workers, 2);
        assert_eq!(settings.timezone, "IST");
    }

    #[test]
    fn parse_strategies_rejects_empty_and_duplicates() {
        assert_eq!(
            parse_strategies(" Distance , Trendline ").unwrap(),
            vec!["Distance", "Trendline"]
        );
        assert_eq!(parse_strategies("Distance,,Trendline"), Err(StrategyListError::EmptyToken));
        assert_eq!(
            parse_strategies("Distance,distance"),
            Err(StrategyListError::DuplicateStrategy("distance".into()))
        );
    }

    #[test]
    fn invalid_values_rejected() {
        assert_invalid(
            load_settings(&MapConfig::new(&[("filters", "min_win_rate", "120")])),
            "min_win_rate",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("filters", "min_trades", "-1")])),
            "min_trades",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("filters", "band_below_pct", "1")])),
            "band_below_pct",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("filters", "band_above_pct", "-1")])),
            "band_above_pct",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("filters", "exit_recency_days", "-2")])),
            "exit_recency_days",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("prices", "workers", "0")])),
            "workers",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("prices", "provider", "bloomberg")])),
            "provider",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("sources", "strategies", "A,,B")])),
            "strategies",
        );
        assert_invalid(
            load_settings(&MapConfig::new(&[("sources", "history_depth", "0")])),
            "history_depth",
        );
    }
}
