//! File report adapter implementing ReportPort.
//!
//! Per instrument it writes the daily table, the trade log and the fill
//! log as CSV, and a JSON summary holding the metrics and diagnostics.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::error::SigtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::result::{BacktestResult, Diagnostic};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

#[derive(Serialize)]
struct Summary<'a> {
    symbol: &'a str,
    bars: usize,
    final_equity: f64,
    final_cash: f64,
    final_position: i64,
    realized_pnl: f64,
    metrics: &'a Metrics,
    diagnostics: &'a [Diagnostic],
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), SigtraderError> {
        let file = File::create(path).map_err(|e| report_error(path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row).map_err(|e| report_error(path, e))?;
        }
        writer.flush().map_err(|e| report_error(path, e))?;
        Ok(())
    }

    fn write_summary(path: &Path, result: &BacktestResult) -> Result<(), SigtraderError> {
        let summary = Summary {
            symbol: &result.symbol,
            bars: result.daily.len(),
            final_equity: result.final_equity(),
            final_cash: result.final_cash,
            final_position: result.final_position,
            realized_pnl: result.realized_pnl,
            metrics: &result.metrics,
            diagnostics: &result.diagnostics,
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|e| report_error(path, e))?;
        fs::write(path, json).map_err(|e| report_error(path, e))
    }
}

fn report_error(path: &Path, err: impl std::fmt::Display) -> SigtraderError {
    SigtraderError::Report {
        reason: format!("{}: {}", path.display(), err),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SigtraderError> {
        fs::create_dir_all(output_dir).map_err(|e| report_error(output_dir, e))?;

        let symbol = &result.symbol;
        let daily = output_dir.join(format!("{symbol}_daily.csv"));
        let trades = output_dir.join(format!("{symbol}_trades.csv"));
        let fills = output_dir.join(format!("{symbol}_fills.csv"));
        let summary = output_dir.join(format!("{symbol}_metrics.json"));

        Self::write_csv(&daily, &result.daily)?;
        Self::write_csv(&trades, &result.trades)?;
        Self::write_csv(&fills, &result.fills)?;
        Self::write_summary(&summary, result)?;

        tracing::info!(symbol = %symbol, dir = %output_dir.display(), "report written");
        Ok(vec![daily, trades, fills, summary])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, PositionSizing, run_backtest};
    use crate::domain::ohlcv::{Bar, BarSeries};
    use crate::domain::signal::{Signal, SignalPoint, SignalSeries};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes = [10.0, 11.0, 12.0, 11.5, 13.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 100,
            })
            .collect();
        let series = BarSeries::new("TEST", bars).unwrap();
        let signals = SignalSeries::new(vec![
            SignalPoint {
                date: start,
                signal: Signal::EnterLong,
            },
            SignalPoint {
                date: start + chrono::Duration::days(2),
                signal: Signal::ExitLong,
            },
        ]);
        let config = BacktestConfig {
            initial_capital: 1000.0,
            commission_rate: 0.0,
            slippage: 0.0,
            position_sizing: PositionSizing::FixedShares(10),
            ..BacktestConfig::default()
        };
        run_backtest(&series, &signals, &config).unwrap()
    }

    #[test]
    fn writes_all_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("reports");
        let result = sample_result();

        let written = CsvReportAdapter::new().write(&result, &out).unwrap();

        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        assert!(out.join("TEST_daily.csv").exists());
        assert!(out.join("TEST_metrics.json").exists());
    }

    #[test]
    fn daily_csv_has_one_row_per_bar() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("TEST_daily.csv")).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,close,cash,position,market_value,equity,daily_return,drawdown"
        );
        assert_eq!(lines.count(), 5);
        // the first bar has no prior equity, so its return cell is empty
        let first = content.lines().nth(1).unwrap();
        assert!(first.starts_with("2024-01-01,10.0,1000.0,0,"));
    }

    #[test]
    fn trades_csv_lists_closed_trades() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("TEST_trades.csv")).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), result.trades.len());
        assert_eq!(&rows[0][0], "2024-01-02");
    }

    #[test]
    fn summary_json_carries_metrics() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("TEST_metrics.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["bars"], 5);
        assert_eq!(json["metrics"]["total_trades"], 1);
        assert!(json["diagnostics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn all_winning_run_keeps_unbounded_profit_factor() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        assert!(result.metrics.profit_factor.is_infinite());
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("TEST_metrics.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["metrics"]["profit_factor"], "inf");
        assert_eq!(json["metrics"]["trades_won"], 1);
    }

    #[test]
    fn unwritable_directory_is_report_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = CsvReportAdapter::new()
            .write(&sample_result(), &blocker.join("sub"))
            .unwrap_err();
        assert!(matches!(err, SigtraderError::Report { .. }));
    }
}
