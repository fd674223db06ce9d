//! Core domain types and logic.

pub mod ohlcv;
pub mod catalog;
pub mod indicator;
pub mod indicator_helpers;
pub mod frame;
pub mod voting;
pub mod combinator;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
