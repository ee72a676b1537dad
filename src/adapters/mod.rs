//! Concrete adapter implementations for ports.

pub mod csv_store;
pub mod csv_schema;
pub mod file_config_adapter;
pub mod fundamentals_csv_adapter;
pub mod stock_data_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
pub mod fetch_metadata;
