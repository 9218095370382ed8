//! Signal generation port.

use crate::domain::ohlcv::BarSeries;
use crate::domain::signal::SignalSeries;

/// Produces one signal series per bar series, before simulation starts.
pub trait SignalSource {
    fn name(&self) -> String;

    fn generate(&self, bars: &BarSeries) -> SignalSeries;
}
