//! Backtest engine and event loop.
//!
//! One run per instrument, strictly sequential over bars:
//! 1. fill the order scheduled by the previous bar's signal at this bar's open
//! 2. mark the ledger to this bar's close
//! 3. hand this bar's signal to the scheduler, sized from the fresh snapshot
//!
//! Instruments never share state, so a batch runs them in parallel.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn};

use super::error::SigtraderError;
use super::execution::{ExecutionScheduler, Scheduled, SizingContext};
use super::ledger::Ledger;
use super::metrics::{self, DEFAULT_PERIODS_PER_YEAR, Metrics};
use super::ohlcv::{Bar, BarSeries};
use super::order::Order;
use super::result::{BacktestResult, Diagnostic};
use super::signal::SignalSeries;

/// How many shares an order carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PositionSizing {
    FixedShares(i64),
    FractionOfEquity(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub slippage: f64,
    pub position_sizing: PositionSizing,
    pub periods_per_year: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 100_000.0,
            commission_rate: 0.001,
            slippage: 0.001,
            position_sizing: PositionSizing::FractionOfEquity(1.0),
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        let invalid = |key: &str, reason: &str| SigtraderError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason: reason.into(),
        };

        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(invalid("initial_capital", "initial_capital must be positive"));
        }
        if !(self.commission_rate.is_finite() && self.commission_rate >= 0.0) {
            return Err(invalid(
                "commission_rate",
                "commission_rate must be non-negative",
            ));
        }
        if !(self.slippage.is_finite() && (0.0..1.0).contains(&self.slippage)) {
            return Err(invalid("slippage", "slippage must be in [0, 1)"));
        }
        match self.position_sizing {
            PositionSizing::FixedShares(n) if n <= 0 => {
                return Err(invalid("fixed_shares", "fixed_shares must be positive"));
            }
            PositionSizing::FractionOfEquity(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(invalid(
                    "fraction_of_equity",
                    "fraction_of_equity must be in (0, 1]",
                ));
            }
            _ => {}
        }
        if self.periods_per_year == 0 {
            return Err(invalid("periods_per_year", "periods_per_year must be positive"));
        }
        Ok(())
    }
}

/// Runs one instrument. Validation failures return before any ledger state
/// exists; order rejections are recorded as diagnostics and never abort.
pub fn run_backtest(
    bars: &BarSeries,
    signals: &SignalSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    config.validate()?;
    let aligned = signals.align(bars)?;

    let span = info_span!("backtest", symbol = bars.symbol());
    let _guard = span.enter();

    let mut ledger = Ledger::new(config.initial_capital, config.commission_rate);
    let mut scheduler = ExecutionScheduler::new(config);
    let mut diagnostics = Vec::new();
    let mut pending: Option<Order> = None;

    for (index, (bar, &signal)) in bars.bars().iter().zip(&aligned).enumerate() {
        if let Some(order) = pending.take() {
            match ledger.apply(&order) {
                Ok(fill) => debug!(
                    date = %fill.date,
                    side = %fill.side,
                    quantity = fill.quantity,
                    price = fill.price,
                    cash = fill.cash_after,
                    "order filled"
                ),
                Err(reason) => {
                    warn!(date = %order.date, side = %order.side, %reason, "order rejected");
                    diagnostics.push(Diagnostic::OrderRejected {
                        date: order.date,
                        signal_date: order.signal_date,
                        side: order.side,
                        quantity: order.quantity,
                        reason,
                    });
                }
            }
        }

        let snapshot = ledger.mark(bar.date, bar.close);
        let ctx = SizingContext {
            equity: snapshot.equity,
            position: snapshot.position,
        };

        match scheduler.on_signal(bars, index, signal, ctx) {
            Scheduled::Order(order) => pending = Some(order),
            Scheduled::Dropped(signal) => {
                warn!(date = %bar.date, %signal, "signal on final bar dropped");
                diagnostics.push(Diagnostic::SignalDropped {
                    date: bar.date,
                    signal,
                });
            }
            Scheduled::Nothing => {}
        }
    }

    let equity = ledger.equity_curve();
    let metrics = Metrics::compute(&equity, ledger.trades(), config.periods_per_year);
    let daily_returns = metrics::daily_returns(&equity);
    let drawdowns = metrics::drawdown_series(&equity);

    info!(
        bars = bars.len(),
        trades = ledger.trades().len(),
        diagnostics = diagnostics.len(),
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult::assemble(
        bars.symbol().to_string(),
        ledger,
        daily_returns,
        drawdowns,
        metrics,
        diagnostics,
    ))
}

/// Raw input for one instrument of a batch. Bars are validated inside the
/// instrument's own run so a bad series fails only that instrument.
#[derive(Debug, Clone)]
pub struct InstrumentInput {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub signals: SignalSeries,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub results: BTreeMap<String, BacktestResult>,
    pub failures: BTreeMap<String, SigtraderError>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn run_instrument(
    input: &InstrumentInput,
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    let bars = BarSeries::new(input.symbol.clone(), input.bars.clone())?;
    run_backtest(&bars, &input.signals, config)
}

/// Runs every instrument independently. A failure is reported against its
/// symbol and never affects the others.
pub fn run_batch(
    inputs: &[InstrumentInput],
    config: &BacktestConfig,
    parallel: bool,
) -> BatchResult {
    let outcomes: Vec<(String, Result<BacktestResult, SigtraderError>)> = if parallel {
        inputs
            .par_iter()
            .map(|input| (input.symbol.clone(), run_instrument(input, config)))
            .collect()
    } else {
        inputs
            .iter()
            .map(|input| (input.symbol.clone(), run_instrument(input, config)))
            .collect()
    };

    let mut batch = BatchResult::default();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                batch.results.insert(symbol, result);
            }
            Err(err) => {
                warn!(%symbol, error = %err, "instrument failed");
                batch.failures.insert(symbol, err);
            }
        }
    }
    batch
}
