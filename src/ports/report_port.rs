//! Report generation port.

use crate::domain::error::SigtraderError;
use crate::domain::result::BacktestResult;
use std::path::{Path, PathBuf};

/// Port for writing backtest results somewhere outside the engine.
pub trait ReportPort {
    /// Writes one instrument's result; returns the files written.
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SigtraderError>;
}
