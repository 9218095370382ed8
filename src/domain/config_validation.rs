//! Configuration validation.
//!
//! Every key is checked before any instrument runs. `ConfigPort` getters
//! fall back to a default on unparsable values, so numeric keys are read
//! as strings here and parsed explicitly.

use crate::domain::error::SigtraderError;
use crate::domain::strategy::SignalMode;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_position_sizing(config)?;
    validate_periods_per_year(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if strategy_kind(config)? == "ma_cross" {
        validate_ma_periods(config)?;
    } else {
        read_period(config, "window", 20)?;
    }
    read_signal_mode(config)?;
    Ok(())
}

/// At least one symbol must be configured, via `symbols` or `symbol`.
pub fn validate_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, SigtraderError> {
    let symbols = parse_symbols(config);
    if symbols.is_empty() {
        return Err(missing("backtest", "symbols"));
    }
    Ok(symbols)
}

pub fn parse_symbols(config: &dyn ConfigPort) -> Vec<String> {
    let mut raw = config.get_list("backtest", "symbols");
    if raw.is_empty() {
        raw = config.get_list("backtest", "symbol");
    }

    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.into_iter().map(|s| s.to_uppercase()) {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

/// Reads a float key. Absent keys yield `default`; present but unparsable
/// ones are an error.
pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

pub fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not an integer"))),
    }
}

pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, "invalid date format, expected YYYY-MM-DD")),
    }
}

/// A strictly positive window length from `[strategy]`.
pub fn read_period(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<usize, SigtraderError> {
    let value = read_i64(config, "strategy", key, default)?;
    if value < 1 {
        return Err(invalid("strategy", key, format!("{key} must be at least 1")));
    }
    Ok(value as usize)
}

pub fn read_signal_mode(config: &dyn ConfigPort) -> Result<SignalMode, SigtraderError> {
    match config.get_string("strategy", "signal_mode") {
        None => Ok(SignalMode::default()),
        Some(raw) => raw
            .parse::<SignalMode>()
            .map_err(|reason| invalid("strategy", "signal_mode", reason)),
    }
}

/// The normalised `[strategy] kind`, either `ma_cross` or `mean_reversion`.
pub fn strategy_kind(config: &dyn ConfigPort) -> Result<String, SigtraderError> {
    let kind = config
        .get_string("strategy", "kind")
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing("strategy", "kind"))?;
    match kind.as_str() {
        "ma_cross" | "mean_reversion" => Ok(kind),
        other => Err(invalid(
            "strategy",
            "kind",
            format!("unknown strategy '{other}' (expected ma_cross or mean_reversion)"),
        )),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_f64(config, "backtest", "initial_capital", 100_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_f64(config, "backtest", "commission_rate", 0.001)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_f64(config, "backtest", "slippage", 0.001)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "slippage",
            "slippage must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_position_sizing(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let fixed = config.get_string("backtest", "fixed_shares");
    let fraction = config.get_string("backtest", "fraction_of_equity");

    if fixed.is_some() && fraction.is_some() {
        return Err(invalid(
            "backtest",
            "fixed_shares",
            "fixed_shares and fraction_of_equity are mutually exclusive",
        ));
    }

    if fixed.is_some() {
        let shares = read_i64(config, "backtest", "fixed_shares", 0)?;
        if shares < 1 {
            return Err(invalid(
                "backtest",
                "fixed_shares",
                "fixed_shares must be at least 1",
            ));
        }
    } else {
        let fraction = read_f64(config, "backtest", "fraction_of_equity", 1.0)?;
        if fraction <= 0.0 || fraction > 1.0 {
            return Err(invalid(
                "backtest",
                "fraction_of_equity",
                "fraction_of_equity must be in (0, 1]",
            ));
        }
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_i64(config, "backtest", "periods_per_year", 252)?;
    if value < 1 || value > u32::MAX as i64 {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be a positive integer",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let start = read_date(config, "backtest", "start_date")?;
    let end = read_date(config, "backtest", "end_date")?;

    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        )),
        _ => Ok(()),
    }
}

fn validate_ma_periods(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let fast = read_period(config, "fast_period", 5)?;
    let slow = read_period(config, "slow_period", 20)?;
    if fast >= slow {
        return Err(invalid(
            "strategy",
            "fast_period",
            "fast_period must be less than slow_period",
        ));
    }
    Ok(())
}

fn missing(section: &str, key: &str) -> SigtraderError {
    SigtraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SigtraderError {
    SigtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
