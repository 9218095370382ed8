//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod order;
pub mod execution;
pub mod position;
pub mod ledger;
pub mod indicator;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod result;
pub mod config_validation;
pub mod error;
