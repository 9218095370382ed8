//! Simple Moving Average over closes.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n, summed per window so long series
//! carry no accumulated rounding.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::IndicatorPoint;
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || bars.is_empty() {
        return Vec::new();
    }

    let warmup = period - 1;
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= warmup;
            let value = if valid {
                let window = &bars[i + 1 - period..=i];
                window.iter().map(|b| b.close).sum::<f64>() / period as f64
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert!(!series[0].valid);
        assert!(!series[1].valid);
        assert!(series[2..].iter().all(|p| p.valid));
    }

    #[test]
    fn sma_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert!((series[2].value - 20.0).abs() < 1e-10);
        assert!((series[3].value - 30.0).abs() < 1e-10);
        assert!((series[4].value - 40.0).abs() < 1e-10);
    }

    #[test]
    fn sma_period_one_is_close() {
        let bars = make_bars(&[10.0, 12.5]);
        let series = calculate_sma(&bars, 1);
        assert_eq!(series[1].value, 12.5);
        assert!(series[0].valid);
    }

    #[test]
    fn sma_degenerate_inputs() {
        assert!(calculate_sma(&[], 3).is_empty());
        assert!(calculate_sma(&make_bars(&[1.0]), 0).is_empty());
    }

    #[test]
    fn sma_window_ignores_bars_that_left_it() {
        let bars = make_bars(&[1e16, 2.5, 2.5, 2.5]);
        let series = calculate_sma(&bars, 2);

        assert_eq!(series[2].value, 2.5);
        assert_eq!(series[3].value, 2.5);
    }
}
