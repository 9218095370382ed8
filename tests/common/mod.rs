#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::backtest::{BacktestConfig, PositionSizing};
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::{Bar, BarSeries};
use sigtrader::domain::signal::{Signal, SignalPoint, SignalSeries};
use sigtrader::ports::data_port::BarSource;
use std::collections::HashMap;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| SigtraderError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from 2024-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(date: NaiveDate, open: f64, close: f64) -> Bar {
    Bar {
        date,
        open,
        high: open.max(close) + 1.0,
        low: (open.min(close) - 1.0).max(0.01),
        close,
        volume: 1000,
    }
}

pub fn bars_from(opens: &[f64], closes: &[f64]) -> Vec<Bar> {
    opens
        .iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (&open, &close))| make_bar(day(i), open, close))
        .collect()
}

/// Bars whose open equals the close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    bars_from(closes, closes)
}

pub fn series(symbol: &str, bars: Vec<Bar>) -> BarSeries {
    BarSeries::new(symbol, bars).unwrap()
}

/// Signals keyed by bar index.
pub fn signals(points: &[(usize, Signal)]) -> SignalSeries {
    points
        .iter()
        .map(|&(i, signal)| SignalPoint {
            date: day(i),
            signal,
        })
        .collect()
}

/// No commission or slippage, fixed share count.
pub fn frictionless(capital: f64, shares: i64) -> BacktestConfig {
    BacktestConfig {
        initial_capital: capital,
        commission_rate: 0.0,
        slippage: 0.0,
        position_sizing: PositionSizing::FixedShares(shares),
        ..BacktestConfig::default()
    }
}

/// A gently trending series with a dip in the middle, long enough for
/// the default MA windows to produce crossovers.
pub fn wave_closes(count: usize, base: f64) -> Vec<f64> {
    (0..count)
        .map(|i| base + 10.0 * ((i as f64) / 8.0).sin() + i as f64 * 0.1)
        .collect()
}
