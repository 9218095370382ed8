//! Domain error types.

use chrono::NaiveDate;

/// Why the ledger refused a single order. Recoverable: the run continues.
#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
pub enum OrderRejection {
    #[error("insufficient capital: need {required:.2}, have {available:.2}")]
    InsufficientCapital { required: f64, available: f64 },

    #[error("insufficient position: requested {requested}, held {held}")]
    InsufficientPosition { requested: i64, held: i64 },
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("invalid bar data for {symbol} on {date}: {reason}")]
    InvalidBarData {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("signal alignment error for {symbol} on {date}: {reason}")]
    SignalAlignment {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    /// Validation errors abort one instrument's run before any state mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SigtraderError::InvalidBarData { .. } | SigtraderError::SignalAlignment { .. }
        )
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) | SigtraderError::Report { .. } => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::NoData { .. } | SigtraderError::Data { .. } => 3,
            SigtraderError::InvalidBarData { .. } | SigtraderError::SignalAlignment { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
