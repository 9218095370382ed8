//! Orders produced by the scheduler and consumed by the ledger.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A single fixed-size order, effective at `bar_index`.
///
/// `signal_index` is the bar whose signal produced the order and is always
/// strictly before `bar_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub signal_index: usize,
    pub signal_date: NaiveDate,
    pub bar_index: usize,
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: i64,
    pub reference_price: f64,
    pub fill_price: f64,
}

impl Order {
    pub fn notional(&self) -> f64 {
        self.fill_price * self.quantity as f64
    }
}
