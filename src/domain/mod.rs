//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod factor;
pub mod strategy;
pub mod position;
pub mod backtest;
pub mod risk;
pub mod portfolio;
pub mod config_validation;
pub mod universe;
pub mod error;

/// Annualization base for every daily-to-yearly conversion.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
