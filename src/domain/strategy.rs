//! Bundled signal generators.
//!
//! Each generator reduces a bar to a state: +1 (want long), -1 (want flat)
//! or 0 (no opinion, including indicator warm-up). `SignalMode` decides
//! whether that state becomes a signal on every bar or only where it
//! changes.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::BarSeries;
use crate::domain::signal::{Signal, SignalPoint, SignalSeries};
use crate::ports::signal_port::SignalSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalMode {
    /// Signal only on the bar where the state changes.
    #[default]
    Event,
    /// Signal the current state on every bar.
    State,
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "event" => Ok(SignalMode::Event),
            "state" => Ok(SignalMode::State),
            other => Err(format!("unknown signal mode '{other}' (expected event or state)")),
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalMode::Event => write!(f, "event"),
            SignalMode::State => write!(f, "state"),
        }
    }
}

/// Turns per-bar states into signals. Flat bars are left out; alignment
/// fills them back in.
pub fn states_to_signals(bars: &BarSeries, states: &[i8], mode: SignalMode) -> SignalSeries {
    let mut previous = 0;
    bars.bars()
        .iter()
        .zip(states)
        .filter_map(|(bar, &state)| {
            let emit = match mode {
                SignalMode::State => state != 0,
                SignalMode::Event => state != 0 && state != previous,
            };
            previous = state;
            emit.then(|| SignalPoint {
                date: bar.date,
                signal: Signal::from_state(state),
            })
        })
        .collect()
}

/// Long while the fast SMA is above the slow SMA.
#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    pub mode: SignalMode,
}

impl Default for MaCrossover {
    fn default() -> Self {
        MaCrossover {
            fast_period: 5,
            slow_period: 20,
            mode: SignalMode::Event,
        }
    }
}

impl MaCrossover {
    pub fn states(&self, bars: &BarSeries) -> Vec<i8> {
        let fast = calculate_sma(bars.bars(), self.fast_period);
        let slow = calculate_sma(bars.bars(), self.slow_period);
        fast.iter()
            .zip(&slow)
            .map(|(f, s)| match (f.get(), s.get()) {
                (Some(f), Some(s)) if f > s => 1,
                (Some(f), Some(s)) if f < s => -1,
                _ => 0,
            })
            .collect()
    }
}

impl SignalSource for MaCrossover {
    fn name(&self) -> String {
        format!(
            "MA crossover ({}/{}, {})",
            self.fast_period, self.slow_period, self.mode
        )
    }

    fn generate(&self, bars: &BarSeries) -> SignalSeries {
        states_to_signals(bars, &self.states(bars), self.mode)
    }
}

/// Long while the close is below its SMA, flat once it is above.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversion {
    pub window: usize,
    pub mode: SignalMode,
}

impl Default for MeanReversion {
    fn default() -> Self {
        MeanReversion {
            window: 20,
            mode: SignalMode::Event,
        }
    }
}

impl MeanReversion {
    pub fn states(&self, bars: &BarSeries) -> Vec<i8> {
        let ma = calculate_sma(bars.bars(), self.window);
        bars.bars()
            .iter()
            .zip(&ma)
            .map(|(bar, point)| match point.get() {
                Some(avg) if bar.close < avg => 1,
                Some(avg) if bar.close > avg => -1,
                _ => 0,
            })
            .collect()
    }
}

impl SignalSource for MeanReversion {
    fn name(&self) -> String {
        format!("Mean reversion ({}, {})", self.window, self.mode)
    }

    fn generate(&self, bars: &BarSeries) -> SignalSeries {
        states_to_signals(bars, &self.states(bars), self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect();
        BarSeries::new("TEST", bars).unwrap()
    }

    fn signals_of(s: &SignalSeries) -> Vec<(usize, Signal)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        s.points()
            .iter()
            .map(|p| ((p.date - start).num_days() as usize, p.signal))
            .collect()
    }

    #[test]
    fn signal_mode_parsing() {
        assert_eq!("event".parse::<SignalMode>().unwrap(), SignalMode::Event);
        assert_eq!(" STATE ".parse::<SignalMode>().unwrap(), SignalMode::State);
        assert!("sometimes".parse::<SignalMode>().is_err());
        assert_eq!(SignalMode::default(), SignalMode::Event);
    }

    #[test]
    fn event_mode_emits_only_changes() {
        let bars = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let states = [0, 1, 1, -1, -1];
        let out = states_to_signals(&bars, &states, SignalMode::Event);
        assert_eq!(
            signals_of(&out),
            vec![(1, Signal::EnterLong), (3, Signal::ExitLong)]
        );
    }

    #[test]
    fn state_mode_emits_every_non_zero_bar() {
        let bars = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let states = [0, 1, 1, -1, -1];
        let out = states_to_signals(&bars, &states, SignalMode::State);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn event_mode_reemits_after_neutral_bar() {
        let bars = series(&[1.0, 2.0, 3.0]);
        let out = states_to_signals(&bars, &[1, 0, 1], SignalMode::Event);
        assert_eq!(
            signals_of(&out),
            vec![(0, Signal::EnterLong), (2, Signal::EnterLong)]
        );
    }

    #[test]
    fn ma_crossover_states() {
        // fast=1 is the close itself, slow=3 lags
        let strategy = MaCrossover {
            fast_period: 1,
            slow_period: 3,
            mode: SignalMode::Event,
        };
        let bars = series(&[10.0, 10.0, 10.0, 13.0, 14.0, 9.0, 8.0]);
        assert_eq!(strategy.states(&bars), vec![0, 0, 0, 1, 1, -1, -1]);

        let out = strategy.generate(&bars);
        assert_eq!(
            signals_of(&out),
            vec![(3, Signal::EnterLong), (5, Signal::ExitLong)]
        );
    }

    #[test]
    fn ma_crossover_equal_averages_after_spike_are_neutral() {
        let strategy = MaCrossover {
            fast_period: 2,
            slow_period: 3,
            mode: SignalMode::Event,
        };
        let bars = series(&[1e16, 2.5, 2.5, 2.5, 2.5, 2.5, 2.5]);
        assert_eq!(strategy.states(&bars), vec![0, 0, -1, 0, 0, 0, 0]);
    }

    #[test]
    fn ma_crossover_modes_differ_in_signal_count() {
        let bars = series(&[10.0, 10.0, 10.0, 13.0, 14.0, 15.0, 9.0, 8.0, 7.0]);
        let event = MaCrossover {
            fast_period: 1,
            slow_period: 3,
            mode: SignalMode::Event,
        };
        let state = MaCrossover {
            mode: SignalMode::State,
            ..event.clone()
        };
        assert_eq!(event.generate(&bars).len(), 2);
        assert_eq!(state.generate(&bars).len(), 6);
    }

    #[test]
    fn mean_reversion_buys_below_average() {
        let strategy = MeanReversion {
            window: 3,
            mode: SignalMode::Event,
        };
        let bars = series(&[10.0, 10.0, 10.0, 7.0, 12.0, 12.0]);
        // sma3: -, -, 10, 9, 9.67, 10.33
        assert_eq!(strategy.states(&bars), vec![0, 0, 0, 1, -1, -1]);
        assert_eq!(
            signals_of(&strategy.generate(&bars)),
            vec![(3, Signal::EnterLong), (4, Signal::ExitLong)]
        );
    }

    #[test]
    fn names_include_parameters() {
        assert_eq!(MaCrossover::default().name(), "MA crossover (5/20, event)");
        assert_eq!(MeanReversion::default().name(), "Mean reversion (20, event)");
    }
}
