//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    BacktestConfig, BatchResult, InstrumentInput, PositionSizing, run_batch,
};
use crate::domain::config_validation::{
    parse_symbols, read_date, read_f64, read_i64, read_period, read_signal_mode, strategy_kind,
    validate_backtest_config, validate_strategy_config, validate_symbols,
};
use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::result::{BacktestResult, Diagnostic};
use crate::domain::strategy::{MaCrossover, MeanReversion};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;
use crate::ports::signal_port::SignalSource;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Signal-driven portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols that have bar data
    ListSymbols {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Date window applied when fetching bars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest(
                    &config,
                    data_dir.as_deref(),
                    symbol.as_deref(),
                    output.as_deref(),
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir, config } => {
            run_list_symbols(data_dir.as_deref(), config.as_deref())
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &SigtraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_backtest(
    config_path: &Path,
    data_dir_override: Option<&Path>,
    symbol_override: Option<&str>,
    output_dir: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(&e);
    }

    // Stage 2: Build engine inputs
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let symbols = match resolve_symbols(symbol_override, &adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let window = match resolve_window(&adapter) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };
    let data_dir = resolve_data_dir(data_dir_override, &adapter);
    let parallel = adapter.get_bool("backtest", "parallel", true);

    eprintln!("Strategy: {}", strategy.name());
    eprintln!(
        "Running {} symbol(s) from {}",
        symbols.len(),
        data_dir.display()
    );

    // Stage 3: Run
    let source = CsvAdapter::new(data_dir);
    let batch = run_pipeline(
        &source,
        strategy.as_ref(),
        &bt_config,
        &symbols,
        window,
        parallel,
    );

    // Stage 4: Report
    for result in batch.results.values() {
        print_summary(result);
    }
    for (symbol, err) in &batch.failures {
        let kind = if err.is_validation() { "rejected input" } else { "failed" };
        eprintln!("\nwarning: {symbol} {kind}: {err}");
    }
    if !batch.is_complete() {
        eprintln!(
            "{} of {} symbols completed",
            batch.results.len(),
            batch.results.len() + batch.failures.len()
        );
    }

    if let Some(dir) = output_dir {
        let reporter = CsvReportAdapter::new();
        for result in batch.results.values() {
            match reporter.write(result, dir) {
                Ok(paths) => {
                    for path in paths {
                        eprintln!("Report written to: {}", path.display());
                    }
                }
                Err(e) => return fail(&e),
            }
        }
    }

    if batch.results.is_empty() {
        return match batch.failures.values().next() {
            Some(err) => {
                eprintln!("error: no symbol completed");
                err.into()
            }
            None => ExitCode::from(3),
        };
    }
    ExitCode::SUCCESS
}

/// Fetches, validates and runs every symbol. Acquisition and validation
/// failures are reported against their symbol alongside engine failures.
pub fn run_pipeline(
    source: &dyn BarSource,
    strategy: &dyn SignalSource,
    config: &BacktestConfig,
    symbols: &[String],
    window: DateWindow,
    parallel: bool,
) -> BatchResult {
    let mut inputs = Vec::with_capacity(symbols.len());
    let mut failures: BTreeMap<String, SigtraderError> = BTreeMap::new();

    for symbol in symbols {
        let series = source
            .fetch_bars(symbol, window.start, window.end)
            .and_then(|bars| BarSeries::new(symbol.clone(), bars));
        match series {
            Ok(series) => {
                let signals = strategy.generate(&series);
                tracing::debug!(%symbol, signals = signals.len(), "generated signals");
                inputs.push(InstrumentInput {
                    symbol: symbol.clone(),
                    bars: series.bars().to_vec(),
                    signals,
                });
            }
            Err(err) => {
                tracing::warn!(%symbol, error = %err, "skipping symbol");
                failures.insert(symbol.clone(), err);
            }
        }
    }

    let mut batch = run_batch(&inputs, config, parallel);
    batch.failures.extend(failures);
    batch
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    let position_sizing = match adapter.get_string("backtest", "fixed_shares") {
        Some(_) => PositionSizing::FixedShares(read_i64(adapter, "backtest", "fixed_shares", 0)?),
        None => PositionSizing::FractionOfEquity(read_f64(
            adapter,
            "backtest",
            "fraction_of_equity",
            1.0,
        )?),
    };
    let periods = read_i64(adapter, "backtest", "periods_per_year", 252)?;
    let periods_per_year =
        u32::try_from(periods).map_err(|_| SigtraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "periods_per_year".into(),
            reason: "periods_per_year must be a positive integer".into(),
        })?;

    let config = BacktestConfig {
        initial_capital: read_f64(adapter, "backtest", "initial_capital", 100_000.0)?,
        commission_rate: read_f64(adapter, "backtest", "commission_rate", 0.001)?,
        slippage: read_f64(adapter, "backtest", "slippage", 0.001)?,
        position_sizing,
        periods_per_year,
    };
    config.validate()?;
    Ok(config)
}

pub fn build_strategy(
    adapter: &dyn ConfigPort,
) -> Result<Box<dyn SignalSource + Send + Sync>, SigtraderError> {
    let mode = read_signal_mode(adapter)?;
    if strategy_kind(adapter)? == "ma_cross" {
        Ok(Box::new(MaCrossover {
            fast_period: read_period(adapter, "fast_period", 5)?,
            slow_period: read_period(adapter, "slow_period", 20)?,
            mode,
        }))
    } else {
        Ok(Box::new(MeanReversion {
            window: read_period(adapter, "window", 20)?,
            mode,
        }))
    }
}

pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SigtraderError> {
    match symbol_override {
        Some(s) if !s.trim().is_empty() => Ok(vec![s.trim().to_uppercase()]),
        _ => validate_symbols(config),
    }
}

pub fn resolve_window(config: &dyn ConfigPort) -> Result<DateWindow, SigtraderError> {
    Ok(DateWindow {
        start: read_date(config, "backtest", "start_date")?,
        end: read_date(config, "backtest", "end_date")?,
    })
}

pub fn resolve_data_dir(data_dir_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    data_dir_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== {} ===", result.symbol);
    eprintln!("Final Equity:     {:.2}", result.final_equity());
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annual Return:    {:.2}%", m.annual_return * 100.0);
    eprintln!("Annual Vol:       {:.2}%", m.annual_volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Calmar Ratio:     {:.2}", m.calmar_ratio);
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    eprintln!("DD Duration:      {} bars", m.max_drawdown_duration);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Avg Win / Loss:   {:.2} / {:.2}", m.avg_win, m.avg_loss);
    eprintln!("Avg Hold:         {:.1} bars", m.avg_hold_time);
    let net: f64 = result.trades.iter().map(|t| t.net_pnl()).sum();
    eprintln!("Net Trade P&L:    {:.2}", net);
    let rejected = result.rejected_orders();
    let dropped = result.dropped_signals().len();
    if rejected + dropped > 0 {
        eprintln!("Rejected/Dropped: {} / {}", rejected, dropped);
    }
    if result.final_position != 0 {
        eprintln!("Open Position:    {} shares", result.final_position);
    }

    for diagnostic in &result.diagnostics {
        match diagnostic {
            Diagnostic::OrderRejected {
                date,
                side,
                quantity,
                reason,
                ..
            } => eprintln!("  rejected {side} {quantity} on {date}: {reason}"),
            Diagnostic::SignalDropped { date, signal } => {
                eprintln!("  {signal} on final bar {date} was not executed")
            }
        }
    }
}

pub fn run_dry_run(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let checked = validate_backtest_config(&adapter)
        .and_then(|_| validate_strategy_config(&adapter))
        .and_then(|_| build_backtest_config(&adapter))
        .and_then(|config| Ok((config, build_strategy(&adapter)?)))
        .and_then(|(config, strategy)| {
            Ok((config, strategy, resolve_symbols(symbol_override, &adapter)?))
        });
    let (config, strategy, symbols) = match checked {
        Ok(parts) => parts,
        Err(e) => return fail(&e),
    };

    eprintln!("Config validated successfully");
    eprintln!("\nStrategy: {}", strategy.name());
    eprintln!("\nEngine:");
    eprintln!("  initial_capital: {:.2}", config.initial_capital);
    eprintln!("  commission_rate: {}", config.commission_rate);
    eprintln!("  slippage:        {}", config.slippage);
    match config.position_sizing {
        PositionSizing::FixedShares(n) => eprintln!("  sizing:          {n} shares"),
        PositionSizing::FractionOfEquity(f) => {
            eprintln!("  sizing:          {:.0}% of equity", f * 100.0)
        }
    }
    eprintln!("\nUniverse:");
    eprintln!("  symbols: {}", symbols.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(&e);
    }
    match build_strategy(&adapter) {
        Ok(strategy) => eprintln!("\nStrategy: {}", strategy.name()),
        Err(e) => return fail(&e),
    }

    let symbols = parse_symbols(&adapter);
    if symbols.is_empty() {
        eprintln!("Symbols:  none configured (pass --symbol to backtest)");
    } else {
        eprintln!("Symbols:  {}", symbols.join(", "));
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir_override: Option<&Path>, config_path: Option<&Path>) -> ExitCode {
    let data_dir = match (data_dir_override, config_path) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(path)) => match load_config(path) {
            Ok(config) => resolve_data_dir(None, &config),
            Err(code) => return code,
        },
        (None, None) => PathBuf::from(DEFAULT_DATA_DIR),
    };

    let source = CsvAdapter::new(&data_dir);
    let symbols = match source.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
