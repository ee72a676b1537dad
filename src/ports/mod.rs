//! Port traits for the boundary capabilities the core consumes.

pub mod config_port;
pub mod fundamentals_port;
pub mod quote_port;
