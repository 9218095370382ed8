//! The per-instrument output of a run.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::OrderRejection;
use super::ledger::{Fill, Ledger};
use super::metrics::Metrics;
use super::order::Side;
use super::position::Trade;
use super::signal::Signal;

/// One row of the daily table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub cash: f64,
    pub position: i64,
    pub market_value: f64,
    pub equity: f64,
    pub daily_return: Option<f64>,
    pub drawdown: f64,
}

/// Events that did not abort the run but must not go unreported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    OrderRejected {
        date: NaiveDate,
        signal_date: NaiveDate,
        side: Side,
        quantity: i64,
        reason: OrderRejection,
    },
    SignalDropped {
        date: NaiveDate,
        signal: Signal,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub daily: Vec<DailyRecord>,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    pub metrics: Metrics,
    pub diagnostics: Vec<Diagnostic>,
    pub final_cash: f64,
    pub final_position: i64,
    pub realized_pnl: f64,
}

impl BacktestResult {
    /// Zips the ledger's snapshots with the derived return and drawdown
    /// columns, which are indexed by bar like the snapshots.
    pub fn assemble(
        symbol: String,
        ledger: Ledger,
        daily_returns: Vec<Option<f64>>,
        drawdowns: Vec<f64>,
        metrics: Metrics,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let realized_pnl = ledger.realized_pnl();
        let (snapshots, trades, fills) = ledger.into_parts();
        let (final_cash, final_position) = snapshots
            .last()
            .map(|s| (s.cash, s.position))
            .unwrap_or((0.0, 0));

        let daily = snapshots
            .into_iter()
            .zip(daily_returns)
            .zip(drawdowns)
            .map(|((s, daily_return), drawdown)| DailyRecord {
                date: s.date,
                close: s.close,
                cash: s.cash,
                position: s.position,
                market_value: s.market_value,
                equity: s.equity,
                daily_return,
                drawdown,
            })
            .collect();

        BacktestResult {
            symbol,
            daily,
            trades,
            fills,
            metrics,
            diagnostics,
            final_cash,
            final_position,
            realized_pnl,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.daily.last().map(|d| d.equity).unwrap_or(0.0)
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.daily.iter().map(|d| d.equity).collect()
    }

    pub fn rejected_orders(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::OrderRejected { .. }))
            .count()
    }

    pub fn dropped_signals(&self) -> Vec<(NaiveDate, Signal)> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::SignalDropped { date, signal } => Some((*date, *signal)),
                _ => None,
            })
            .collect()
    }
}
