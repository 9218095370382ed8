//! Execution scheduling: turns the signal seen on bar `i` into an order
//! that fills at bar `i + 1`'s open.
//!
//! Slippage and commission are fractions (0.001 = 10 bps), applied
//! adversely: buys pay more, sells receive less.

use super::backtest::{BacktestConfig, PositionSizing};
use super::ohlcv::BarSeries;
use super::order::{Order, Side};
use super::signal::Signal;

/// Commission on a trade value: `trade_value * rate`.
pub fn calculate_commission(trade_value: f64, commission_rate: f64) -> f64 {
    trade_value * commission_rate
}

/// Cash a buy of `notional` consumes, commission included.
pub fn buy_cost(notional: f64, commission_rate: f64) -> f64 {
    notional + calculate_commission(notional, commission_rate)
}

/// Buy: `price * (1 + slippage)`.
pub fn apply_slippage_buy(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

/// Sell: `price * (1 - slippage)`.
pub fn apply_slippage_sell(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

pub fn apply_slippage(market_price: f64, side: Side, slippage: f64) -> f64 {
    match side {
        Side::Buy => apply_slippage_buy(market_price, slippage),
        Side::Sell => apply_slippage_sell(market_price, slippage),
    }
}

/// Whole shares affordable with `fraction` of `equity`, commission included.
///
/// The estimate is checked against `buy_cost`, the figure the ledger
/// charges, and stepped down until it fits the budget.
pub fn fraction_quantity(equity: f64, fraction: f64, fill_price: f64, commission_rate: f64) -> i64 {
    let budget = equity * fraction;
    if budget <= 0.0 || fill_price <= 0.0 {
        return 0;
    }
    let mut quantity = (budget / (fill_price * (1.0 + commission_rate))).floor() as i64;
    while quantity > 0 && buy_cost(fill_price * quantity as f64, commission_rate) > budget {
        quantity -= 1;
    }
    quantity
}

/// Ledger state visible to the scheduler when it sizes an order: the
/// equity and position recorded at the signal bar's close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingContext {
    pub equity: f64,
    pub position: i64,
}

/// What the scheduler did with one bar's signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    Nothing,
    Order(Order),
    /// Non-flat signal on the final bar; there is no next open to fill at.
    Dropped(Signal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesiredState {
    Flat,
    Long,
}

/// Emits an order only when the desired position state changes. Repeated
/// entries (or exits) without the opposite signal in between are ignored.
#[derive(Debug, Clone)]
pub struct ExecutionScheduler {
    slippage: f64,
    commission_rate: f64,
    sizing: PositionSizing,
    desired: DesiredState,
}

impl ExecutionScheduler {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            slippage: config.slippage,
            commission_rate: config.commission_rate,
            sizing: config.position_sizing,
            desired: DesiredState::Flat,
        }
    }

    pub fn on_signal(
        &mut self,
        bars: &BarSeries,
        index: usize,
        signal: Signal,
        ctx: SizingContext,
    ) -> Scheduled {
        let side = match (signal, self.desired) {
            (Signal::Flat, _) => return Scheduled::Nothing,
            _ if index + 1 >= bars.len() => return Scheduled::Dropped(signal),
            (Signal::EnterLong, DesiredState::Flat) => Side::Buy,
            (Signal::ExitLong, DesiredState::Long) => Side::Sell,
            _ => return Scheduled::Nothing,
        };

        let (Some(signal_bar), Some(next_bar)) = (bars.get(index), bars.get(index + 1)) else {
            return Scheduled::Nothing;
        };

        let reference_price = next_bar.open;
        let fill_price = apply_slippage(reference_price, side, self.slippage);
        let quantity = match (self.sizing, side) {
            (PositionSizing::FixedShares(shares), _) => shares,
            (PositionSizing::FractionOfEquity(fraction), Side::Buy) => {
                fraction_quantity(ctx.equity, fraction, fill_price, self.commission_rate)
            }
            (PositionSizing::FractionOfEquity(_), Side::Sell) => ctx.position,
        };

        self.desired = match side {
            Side::Buy => DesiredState::Long,
            Side::Sell => DesiredState::Flat,
        };

        Scheduled::Order(Order {
            signal_index: index,
            signal_date: signal_bar.date,
            bar_index: index + 1,
            date: next_bar.date,
            side,
            quantity,
            reference_price,
            fill_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    fn bars(opens: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = opens
            .iter()
            .enumerate()
            .map(|(i, &open)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open + 1.0,
                low: open - 1.0,
                close: open,
                volume: 1000,
            })
            .collect();
        BarSeries::new("TEST", bars).unwrap()
    }

    fn config(sizing: PositionSizing) -> BacktestConfig {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_rate: 0.001,
            slippage: 0.01,
            position_sizing: sizing,
            periods_per_year: 252,
        }
    }

    fn ctx(equity: f64, position: i64) -> SizingContext {
        SizingContext { equity, position }
    }

    fn order(s: Scheduled) -> Order {
        match s {
            Scheduled::Order(o) => o,
            other => panic!("expected order, got {other:?}"),
        }
    }

    #[test]
    fn commission_is_fraction_of_value() {
        assert!((calculate_commission(10_000.0, 0.001) - 10.0).abs() < 1e-12);
        assert_eq!(calculate_commission(10_000.0, 0.0), 0.0);
    }

    #[test]
    fn slippage_is_adverse() {
        assert!((apply_slippage_buy(100.0, 0.001) - 100.1).abs() < 1e-9);
        assert!((apply_slippage_sell(100.0, 0.001) - 99.9).abs() < 1e-9);
        assert_eq!(apply_slippage(100.0, Side::Buy, 0.0), 100.0);
    }

    #[test]
    fn fraction_quantity_includes_commission() {
        // 10_000 / (100 * 1.001) = 99.9 -> 99
        assert_eq!(fraction_quantity(10_000.0, 1.0, 100.0, 0.001), 99);
        assert_eq!(fraction_quantity(10_000.0, 0.5, 100.0, 0.0), 50);
        assert_eq!(fraction_quantity(50.0, 1.0, 100.0, 0.0), 0);
    }

    #[test]
    fn fraction_quantity_never_exceeds_charged_cost() {
        // 5280 * 12.3 * 1.0025 rounds one ulp above 65106.36
        let quantity = fraction_quantity(65_106.36, 1.0, 12.3, 0.0025);
        assert!(quantity >= 5279);
        assert!(buy_cost(12.3 * quantity as f64, 0.0025) <= 65_106.36);
    }

    #[test]
    fn buy_cost_adds_commission() {
        assert!((buy_cost(1_000.0, 0.002) - 1_002.0).abs() < 1e-12);
        assert_eq!(buy_cost(1_000.0, 0.0), 1_000.0);
    }

    #[test]
    fn buy_fills_at_next_open_with_slippage() {
        let series = bars(&[10.0, 20.0, 30.0]);
        let mut scheduler = ExecutionScheduler::new(&config(PositionSizing::FixedShares(5)));

        let o = order(scheduler.on_signal(&series, 0, Signal::EnterLong, ctx(10_000.0, 0)));
        assert_eq!(o.signal_index, 0);
        assert_eq!(o.bar_index, 1);
        assert_eq!(o.side, Side::Buy);
        assert_eq!(o.quantity, 5);
        assert_eq!(o.reference_price, 20.0);
        assert!((o.fill_price - 20.2).abs() < 1e-9);
        assert_eq!(
            scheduler.on_signal(&series, 1, Signal::EnterLong, ctx(10_000.0, 5)),
            Scheduled::Nothing
        );
    }

    #[test]
    fn sell_fills_below_next_open() {
        let series = bars(&[10.0, 20.0, 30.0]);
        let mut scheduler = ExecutionScheduler::new(&config(PositionSizing::FixedShares(5)));
        order(scheduler.on_signal(&series, 0, Signal::EnterLong, ctx(10_000.0, 0)));

        let o = order(scheduler.on_signal(&series, 1, Signal::ExitLong, ctx(10_000.0, 5)));
        assert_eq!(o.side, Side::Sell);
        assert_eq!(o.date, series.bars()[2].date);
        assert!((o.fill_price - 29.7).abs() < 1e-9);
        assert_eq!(
            scheduler.on_signal(&series, 1, Signal::ExitLong, ctx(10_000.0, 0)),
            Scheduled::Nothing
        );
    }

    #[test]
    fn repeated_signals_produce_one_order() {
        let series = bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let mut scheduler = ExecutionScheduler::new(&config(PositionSizing::FixedShares(1)));

        assert!(matches!(
            scheduler.on_signal(&series, 0, Signal::EnterLong, ctx(10_000.0, 0)),
            Scheduled::Order(_)
        ));
        assert_eq!(
            scheduler.on_signal(&series, 1, Signal::EnterLong, ctx(10_000.0, 1)),
            Scheduled::Nothing
        );
        assert_eq!(
            scheduler.on_signal(&series, 2, Signal::Flat, ctx(10_000.0, 1)),
            Scheduled::Nothing
        );
        assert!(matches!(
            scheduler.on_signal(&series, 3, Signal::ExitLong, ctx(10_000.0, 1)),
            Scheduled::Order(_)
        ));
    }

    #[test]
    fn exit_while_flat_is_ignored() {
        let series = bars(&[10.0, 11.0, 12.0]);
        let mut scheduler = ExecutionScheduler::new(&config(PositionSizing::FixedShares(1)));
        assert_eq!(
            scheduler.on_signal(&series, 0, Signal::ExitLong, ctx(10_000.0, 0)),
            Scheduled::Nothing
        );
    }

    #[test]
    fn trailing_signal_is_dropped() {
        let series = bars(&[10.0, 11.0, 12.0]);
        let mut scheduler = ExecutionScheduler::new(&config(PositionSizing::FixedShares(1)));
        assert_eq!(
            scheduler.on_signal(&series, 2, Signal::EnterLong, ctx(10_000.0, 0)),
            Scheduled::Dropped(Signal::EnterLong)
        );
        // a dropped entry leaves the scheduler flat
        assert!(matches!(
            scheduler.on_signal(&series, 0, Signal::EnterLong, ctx(10_000.0, 0)),
            Scheduled::Order(_)
        ));
        assert_eq!(
            scheduler.on_signal(&series, 2, Signal::Flat, ctx(10_000.0, 0)),
            Scheduled::Nothing
        );
    }

    #[test]
    fn fraction_sizing_buys_from_equity_and_sells_everything() {
        let series = bars(&[10.0, 100.0, 100.0]);
        let mut scheduler =
            ExecutionScheduler::new(&config(PositionSizing::FractionOfEquity(0.5)));

        let buy = order(scheduler.on_signal(&series, 0, Signal::EnterLong, ctx(10_000.0, 0)));
        // 5_000 / (101 * 1.001) = 49.45 -> 49
        assert_eq!(buy.quantity, 49);

        let sell = order(scheduler.on_signal(&series, 1, Signal::ExitLong, ctx(10_000.0, 49)));
        assert_eq!(sell.quantity, 49);
    }
}
