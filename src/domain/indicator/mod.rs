//! Technical indicators used by the bundled signal generators.

pub mod sma;

use chrono::NaiveDate;

/// A single point in an indicator series. `valid` is false during warm-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}
