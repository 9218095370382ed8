//! Bar acquisition port.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

/// Produces raw bars for a symbol. Implementations do not validate prices;
/// that happens when the bars become a `BarSeries`.
pub trait BarSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError>;
}
