//! OHLCV bars and the validated, time-ordered bar series.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::SigtraderError;

/// One price observation. A missing price is carried as NaN until the
/// series is validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    fn check(&self) -> Result<(), String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if value.is_nan() {
                return Err(format!("null {name}"));
            }
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive number, got {value}"));
            }
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "high {} below max(open, close) {}",
                self.high,
                self.open.max(self.close)
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!(
                "low {} above min(open, close) {}",
                self.low,
                self.open.min(self.close)
            ));
        }
        if self.volume < 0 {
            return Err(format!("negative volume {}", self.volume));
        }
        Ok(())
    }
}

/// Immutable bar history for one instrument, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validates every bar before accepting the series. Nothing downstream
    /// re-checks prices, so this is the only gate.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SigtraderError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SigtraderError::NoData { symbol });
        }

        let mut prev: Option<NaiveDate> = None;
        for bar in &bars {
            if let Some(prev_date) = prev {
                if bar.date <= prev_date {
                    return Err(SigtraderError::InvalidBarData {
                        symbol,
                        date: bar.date,
                        reason: format!("date not after previous bar {prev_date}"),
                    });
                }
            }
            if let Err(reason) = bar.check() {
                return Err(SigtraderError::InvalidBarData {
                    symbol,
                    date: bar.date,
                    reason,
                });
            }
            prev = Some(bar.date);
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Index of the bar on `date`. Dates are sorted, so this is a binary search.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }
}
