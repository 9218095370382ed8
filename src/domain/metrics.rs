//! Return, risk and trade statistics derived from a completed run.
//!
//! Every ratio has an explicit zero fallback for degenerate inputs (no
//! trades, zero variance, no drawdown). Standard deviations are sample
//! (n - 1) deviations; fewer than two observations count as zero.

use serde::{Serialize, Serializer};

use super::position::Trade;

pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    /// `f64::INFINITY` with wins and no losses; written as `"inf"`.
    #[serde(serialize_with = "serialize_unbounded")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_win: f64,
    pub max_loss: f64,
    pub avg_hold_time: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[f64], trades: &[Trade], periods_per_year: u32) -> Self {
        let periods = periods_per_year as f64;
        let returns: Vec<f64> = daily_returns(equity_curve).into_iter().flatten().collect();
        let n = returns.len();

        let total_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        let annual_return = if n > 0 && total_return > -1.0 {
            (1.0 + total_return).powf(periods / n as f64) - 1.0
        } else {
            0.0
        };

        let mean_return = mean(&returns);
        let stdev = sample_stdev(&returns);
        let annual_volatility = stdev * periods.sqrt();

        let sharpe_ratio = if stdev > 0.0 {
            mean_return / stdev * periods.sqrt()
        } else {
            0.0
        };

        let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside = sample_stdev(&negatives);
        let sortino_ratio = if downside > 0.0 {
            mean_return / downside * periods.sqrt()
        } else {
            0.0
        };

        let drawdowns = drawdown_series(equity_curve);
        let max_drawdown = drawdowns.iter().copied().fold(0.0_f64, f64::min);
        let max_drawdown_duration = max_drawdown_duration(&drawdowns);

        let calmar_ratio = if max_drawdown < 0.0 {
            annual_return / max_drawdown.abs()
        } else {
            0.0
        };

        let stats = TradeStats::compute(trades);

        Metrics {
            total_return,
            annual_return,
            annual_volatility,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades: trades.len(),
            trades_won: stats.won,
            trades_lost: stats.lost,
            win_rate: stats.win_rate,
            profit_factor: stats.profit_factor,
            avg_win: stats.avg_win,
            avg_loss: stats.avg_loss,
            max_win: stats.max_win,
            max_loss: stats.max_loss,
            avg_hold_time: stats.avg_hold_time,
        }
    }
}

struct TradeStats {
    won: usize,
    lost: usize,
    win_rate: f64,
    profit_factor: f64,
    avg_win: f64,
    avg_loss: f64,
    max_win: f64,
    max_loss: f64,
    avg_hold_time: f64,
}

impl TradeStats {
    fn compute(trades: &[Trade]) -> Self {
        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p < 0.0).collect();

        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins.len() as f64 / trades.len() as f64
        };

        let gross_wins: f64 = wins.iter().sum();
        let gross_losses: f64 = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_losses > 0.0 {
            gross_wins / gross_losses
        } else if gross_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_hold_time = if trades.is_empty() {
            0.0
        } else {
            trades.iter().map(|t| t.holding_bars as f64).sum::<f64>() / trades.len() as f64
        };

        TradeStats {
            won: wins.len(),
            lost: losses.len(),
            win_rate,
            profit_factor,
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            max_win: wins.iter().copied().reduce(f64::max).unwrap_or(0.0),
            max_loss: losses.iter().copied().reduce(f64::min).unwrap_or(0.0),
            avg_hold_time,
        }
    }
}

/// JSON has no infinities, so non-finite values are written as strings.
fn serialize_unbounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if *value > 0.0 {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

/// `equity[t] / equity[t-1] - 1`; `None` for the first bar (and after a
/// non-positive equity value).
pub fn daily_returns(equity_curve: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(equity_curve.len());
    if equity_curve.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(equity_curve.windows(2).map(|w| {
        if w[0] > 0.0 {
            Some(w[1] / w[0] - 1.0)
        } else {
            None
        }
    }));
    out
}

/// `equity[t] / running_max(equity[..=t]) - 1`, always <= 0.
pub fn drawdown_series(equity_curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::MIN;
    equity_curve
        .iter()
        .map(|&equity| {
            peak = peak.max(equity);
            if peak > 0.0 {
                (equity / peak - 1.0).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Longest run of consecutive bars spent below a prior peak.
fn max_drawdown_duration(drawdowns: &[f64]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &dd in drawdowns {
        if dd < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
