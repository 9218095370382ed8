//! Cash, position and trade bookkeeping for one simulation run.
//!
//! The ledger is a strictly sequential state machine: orders are applied in
//! bar order and every bar is marked to market exactly once, after any fill
//! on that bar. Rejected orders leave the state untouched.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::VecDeque;

use super::error::OrderRejection;
use super::execution::{buy_cost, calculate_commission};
use super::order::{Order, Side};
use super::position::{Lot, Trade};

/// State recorded at one bar's close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub cash: f64,
    pub position: i64,
    pub market_value: f64,
    pub equity: f64,
}

/// An accepted order as it hit the books.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub date: NaiveDate,
    pub signal_date: NaiveDate,
    pub side: Side,
    pub quantity: i64,
    pub reference_price: f64,
    pub price: f64,
    pub commission: f64,
    pub cash_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    commission_rate: f64,
    position: i64,
    realized_pnl: f64,
    lots: VecDeque<Lot>,
    trades: Vec<Trade>,
    fills: Vec<Fill>,
    snapshots: Vec<Snapshot>,
}

impl Ledger {
    pub fn new(initial_capital: f64, commission_rate: f64) -> Self {
        Ledger {
            cash: initial_capital,
            commission_rate,
            position: 0,
            realized_pnl: 0.0,
            lots: VecDeque::new(),
            trades: Vec::new(),
            fills: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Cumulative gross P&L of every unit sold so far.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn apply(&mut self, order: &Order) -> Result<&Fill, OrderRejection> {
        match order.side {
            Side::Buy => self.buy(order),
            Side::Sell => self.sell(order),
        }
    }

    fn buy(&mut self, order: &Order) -> Result<&Fill, OrderRejection> {
        let cost = order.notional();
        let commission = calculate_commission(cost, self.commission_rate);
        let required = buy_cost(cost, self.commission_rate);

        if order.quantity <= 0 || required > self.cash {
            return Err(OrderRejection::InsufficientCapital {
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        self.position += order.quantity;
        self.lots.push_back(Lot::open(
            order.date,
            order.bar_index,
            order.fill_price,
            order.quantity,
            commission,
        ));

        Ok(self.record_fill(order, commission))
    }

    fn sell(&mut self, order: &Order) -> Result<&Fill, OrderRejection> {
        if order.quantity <= 0 || order.quantity > self.position {
            return Err(OrderRejection::InsufficientPosition {
                requested: order.quantity,
                held: self.position,
            });
        }

        let proceeds = order.notional();
        let commission = calculate_commission(proceeds, self.commission_rate);

        self.cash += proceeds - commission;
        self.position -= order.quantity;

        let mut to_close = order.quantity;
        while to_close > 0 {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };
            let share = commission * lot.remaining.min(to_close) as f64 / order.quantity as f64;
            let (taken, gross) = lot.close_partial(to_close, order.fill_price, share);
            to_close -= taken;
            self.realized_pnl += gross;

            if lot.is_closed() {
                let trade = lot.to_trade(order.date, order.bar_index);
                self.trades.push(trade);
                self.lots.pop_front();
            }
        }

        Ok(self.record_fill(order, commission))
    }

    fn record_fill(&mut self, order: &Order, commission: f64) -> &Fill {
        self.fills.push(Fill {
            date: order.date,
            signal_date: order.signal_date,
            side: order.side,
            quantity: order.quantity,
            reference_price: order.reference_price,
            price: order.fill_price,
            commission,
            cash_after: self.cash,
        });
        &self.fills[self.fills.len() - 1]
    }

    /// Marks the book at `close` and appends the bar's snapshot.
    pub fn mark(&mut self, date: NaiveDate, close: f64) -> &Snapshot {
        let market_value = self.position as f64 * close;
        self.snapshots.push(Snapshot {
            date,
            close,
            cash: self.cash,
            position: self.position,
            market_value,
            equity: self.cash + market_value,
        });
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.equity).collect()
    }

    pub fn into_parts(self) -> (Vec<Snapshot>, Vec<Trade>, Vec<Fill>) {
        (self.snapshots, self.trades, self.fills)
    }
}
