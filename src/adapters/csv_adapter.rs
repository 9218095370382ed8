//! CSV file bar source.
//!
//! One file per symbol, `<data_dir>/<SYMBOL>.csv`. Columns are located by
//! header name (case-insensitive), so exports with extra columns such as
//! `Adj Close` load unchanged.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::BarSource;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SigtraderError::NoData {
                symbol: symbol.to_string(),
            },
            _ => SigtraderError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| SigtraderError::Data {
            reason: format!("{}: CSV header error: {}", path.display(), e),
        })?;
        let mut index = [0usize; 6];
        for (slot, column) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| SigtraderError::Data {
                    reason: format!("{}: missing {} column", path.display(), column),
                })?;
        }
        let [date_col, open_col, high_col, low_col, close_col, volume_col] = index;

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SigtraderError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let line = row + 2;

            let date_str = record.get(date_col).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SigtraderError::Data {
                    reason: format!(
                        "{} line {}: invalid date '{}': {}",
                        path.display(),
                        line,
                        date_str,
                        e
                    ),
                }
            })?;

            if start_date.is_some_and(|start| date < start)
                || end_date.is_some_and(|end| date > end)
            {
                continue;
            }

            let price = |col: usize, name: &str| -> Result<f64, SigtraderError> {
                let cell = record.get(col).unwrap_or_default();
                if cell.is_empty() {
                    return Ok(f64::NAN);
                }
                cell.parse().map_err(|e| SigtraderError::Data {
                    reason: format!("{} line {}: invalid {} value: {}", path.display(), line, name, e),
                })
            };

            let open = price(open_col, "open")?;
            let high = price(high_col, "high")?;
            let low = price(low_col, "low")?;
            let close = price(close_col, "close")?;

            // some exports write volume as a float
            let volume_cell = record.get(volume_col).unwrap_or_default();
            let volume = if volume_cell.is_empty() {
                0
            } else {
                volume_cell
                    .parse::<i64>()
                    .or_else(|_| volume_cell.parse::<f64>().map(|v| v as i64))
                    .map_err(|e| SigtraderError::Data {
                        reason: format!(
                            "{} line {}: invalid volume value: {}",
                            path.display(),
                            line,
                            e
                        ),
                    })?
            };

            bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SigtraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SigtraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
