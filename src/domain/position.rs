//! Open lots and completed round-trip trades.

use chrono::NaiveDate;
use serde::Serialize;

/// One accepted buy, consumed FIFO by later sells.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    pub entry_price: f64,
    pub quantity: i64,
    pub remaining: i64,
    pub entry_commission: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub realized_pnl: f64,
}

impl Lot {
    pub fn open(
        entry_date: NaiveDate,
        entry_index: usize,
        entry_price: f64,
        quantity: i64,
        entry_commission: f64,
    ) -> Self {
        Lot {
            entry_date,
            entry_index,
            entry_price,
            quantity,
            remaining: quantity,
            entry_commission,
            exit_value: 0.0,
            exit_commission: 0.0,
            realized_pnl: 0.0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.remaining == 0
    }

    /// Closes up to `quantity` units at `price`; returns the units taken and
    /// their gross P&L.
    pub fn close_partial(&mut self, quantity: i64, price: f64, commission: f64) -> (i64, f64) {
        let taken = quantity.min(self.remaining);
        let gross = taken as f64 * (price - self.entry_price);
        self.remaining -= taken;
        self.exit_value += taken as f64 * price;
        self.exit_commission += commission;
        self.realized_pnl += gross;
        (taken, gross)
    }

    /// Builds the round-trip record for a lot with nothing left open.
    pub fn to_trade(&self, exit_date: NaiveDate, exit_index: usize) -> Trade {
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price: self.exit_value / self.quantity as f64,
            quantity: self.quantity,
            pnl: self.realized_pnl,
            commission: self.entry_commission + self.exit_commission,
            holding_bars: exit_index - self.entry_index,
        }
    }
}

/// A completed round trip. `pnl` is gross; `commission` covers both legs.
///
/// When a lot was closed by several sells, `exit_price` is the
/// quantity-weighted average and `exit_date` is the date of the last one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: i64,
    pub pnl: f64,
    pub commission: f64,
    pub holding_bars: usize,
}

impl Trade {
    pub fn net_pnl(&self) -> f64 {
        self.pnl - self.commission
    }
}
