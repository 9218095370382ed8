//! Trading signals and their alignment to a bar series.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::error::SigtraderError;
use super::ohlcv::BarSeries;

/// A directive attached to one bar. `Flat` is the no-op default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Signal {
    EnterLong,
    ExitLong,
    #[default]
    Flat,
}

impl Signal {
    /// Maps the +1 / -1 / 0 convention used by signal generators.
    pub fn from_state(state: i8) -> Self {
        match state {
            s if s > 0 => Signal::EnterLong,
            s if s < 0 => Signal::ExitLong,
            _ => Signal::Flat,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::EnterLong => write!(f, "ENTER_LONG"),
            Signal::ExitLong => write!(f, "EXIT_LONG"),
            Signal::Flat => write!(f, "FLAT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: Signal,
}

/// Externally produced signals, keyed by bar date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn new(points: Vec<SignalPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resolves exactly one signal per bar. Bars without a signal are `Flat`.
    ///
    /// Fails with `SignalAlignment` when a signal date has no bar or a date
    /// carries two signals.
    pub fn align(&self, bars: &BarSeries) -> Result<Vec<Signal>, SigtraderError> {
        let mut by_date: BTreeMap<NaiveDate, Signal> = BTreeMap::new();
        for point in &self.points {
            if bars.index_of(point.date).is_none() {
                return Err(SigtraderError::SignalAlignment {
                    symbol: bars.symbol().to_string(),
                    date: point.date,
                    reason: "signal date not present in bar series".into(),
                });
            }
            if by_date.insert(point.date, point.signal).is_some() {
                return Err(SigtraderError::SignalAlignment {
                    symbol: bars.symbol().to_string(),
                    date: point.date,
                    reason: "more than one signal for the same bar".into(),
                });
            }
        }

        Ok(bars
            .bars()
            .iter()
            .map(|bar| by_date.get(&bar.date).copied().unwrap_or_default())
            .collect())
    }
}

impl FromIterator<SignalPoint> for SignalSeries {
    fn from_iter<I: IntoIterator<Item = SignalPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
