//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestResult, run_backtest_on_closes};
use crate::domain::catalog::{self, Market};
use crate::domain::combinator::{CombinatorInputs, align_predictions, combine_strategies};
use crate::domain::config_validation::{RunSettings, load_run_settings};
use crate::domain::error::TallyError;
use crate::domain::frame::{IndicatorFrame, add_indicators_with};
use crate::domain::metrics::TradeStats;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::voting::{Signal, SignalSequence, apply_voting};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "tallytrader",
    about = "Indicator voting and single-position backtesting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vote indicators into signals and backtest them
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Backtest trajectory CSV (trade log written beside it)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Indicator frame with votes and composite signal
        #[arg(long)]
        signals: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Combine prediction, RSI and MA strategies and backtest the result
    Combine {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// `date,predicted` CSV, overrides [data] predictions
        #[arg(long)]
        predictions: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List catalog symbols (ph, global)
    Symbols {
        #[arg(long)]
        market: Option<Market>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            signals,
            symbol,
            data_dir,
            dry_run,
        } => load_settings(&config, symbol, data_dir, None).and_then(|settings| {
            if dry_run {
                print_settings(&settings);
                return Ok(());
            }
            let data_port = CsvAdapter::new(settings.data.dir.clone());
            run_voting_command(
                &data_port,
                &settings,
                output.as_deref(),
                signals.as_deref(),
            )
        }),
        Command::Combine {
            config,
            output,
            symbol,
            data_dir,
            predictions,
        } => load_settings(&config, symbol, data_dir, predictions).and_then(|settings| {
            let data_port = CsvAdapter::new(settings.data.dir.clone());
            run_combine_command(&data_port, &settings, output.as_deref())
        }),
        Command::Validate { config } => load_settings(&config, None, None, None).map(|settings| {
            println!("Configuration OK: {}", config.display());
            print_settings(&settings);
        }),
        Command::Symbols { market } => {
            print_symbols(market);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Loads and validates the config file, applying command-line overrides.
pub fn load_settings(
    config_path: &Path,
    symbol: Option<String>,
    data_dir: Option<PathBuf>,
    predictions: Option<PathBuf>,
) -> Result<RunSettings, TallyError> {
    info!(path = %config_path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let mut settings = load_run_settings(&adapter)?;

    if let Some(symbol) = symbol {
        settings.data.symbol = symbol;
    }
    if let Some(dir) = data_dir {
        settings.data.dir = dir;
    }
    if predictions.is_some() {
        settings.data.predictions = predictions;
    }
    Ok(settings)
}

fn fetch_series(data_port: &dyn DataPort, settings: &RunSettings) -> Result<PriceSeries, TallyError> {
    let data = &settings.data;
    match catalog::lookup(&data.symbol) {
        Some((market, listing)) => {
            info!(symbol = %data.symbol, %market, company = listing.name, "fetching prices")
        }
        None => info!(symbol = %data.symbol, "fetching prices (symbol not in catalog)"),
    }
    let series = data_port.fetch_prices(&data.symbol, data.start_date, data.end_date)?;
    info!(symbol = %data.symbol, bars = series.len(), "prices fetched");
    Ok(series)
}

/// Indicator frame, voted signals and their backtest.
pub fn run_voting_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<(IndicatorFrame, SignalSequence, BacktestResult), TallyError> {
    let series = fetch_series(data_port, settings)?;

    let frame = add_indicators_with(&series, &settings.indicators);
    for (indicator, status) in frame.availability() {
        info!(%indicator, %status, "indicator availability");
    }

    let signals = apply_voting(&frame, &settings.voting);
    let result = run_backtest_on_closes(
        &signals.signals(),
        &series.closes(),
        settings.backtest.starting_capital,
    )?;
    Ok((frame, signals, result))
}

/// Combined strategy signals and their backtest.
pub fn run_combinator_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<(Vec<Signal>, BacktestResult), TallyError> {
    if settings.combinator.use_prediction && settings.data.predictions.is_none() {
        return Err(TallyError::ConfigMissing {
            section: "data".to_string(),
            key: "predictions".to_string(),
        });
    }
    let series = fetch_series(data_port, settings)?;

    let predicted = match (&settings.data.predictions, settings.combinator.use_prediction) {
        (Some(path), true) => {
            info!(path = %path.display(), "loading predictions");
            let predictions = CsvAdapter::load_predictions(path)?;
            Some(align_predictions(&series, &predictions))
        }
        _ => None,
    };

    let inputs = CombinatorInputs::from_series(
        &series,
        &settings.combinator,
        settings.indicators.rsi_period,
        predicted,
    )?;
    let signals = combine_strategies(&settings.combinator, &inputs)?;
    let result = run_backtest_on_closes(
        &signals,
        &series.closes(),
        settings.backtest.starting_capital,
    )?;
    Ok((signals, result))
}

fn run_voting_command(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    output: Option<&Path>,
    signals_output: Option<&Path>,
) -> Result<(), TallyError> {
    let (frame, signals, result) = run_voting_pipeline(data_port, settings)?;
    let reporter = CsvReportAdapter::new();

    if let Some(path) = signals_output {
        reporter.write_signals(&frame, &signals, &path.display().to_string())?;
    }
    if let Some(path) = output {
        reporter.write(&result, &path.display().to_string())?;
    }

    let buys = signals.signals().iter().filter(|s| **s == Signal::Buy).count();
    println!("Symbol:           {}", settings.data.symbol);
    println!("Bars:             {}", frame.len());
    println!("Buy signals:      {}", buys);
    print_result(&result);
    Ok(())
}

fn run_combine_command(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    output: Option<&Path>,
) -> Result<(), TallyError> {
    let (signals, result) = run_combinator_pipeline(data_port, settings)?;

    if let Some(path) = output {
        CsvReportAdapter::new().write(&result, &path.display().to_string())?;
    }

    let count = |label: Signal| signals.iter().filter(|s| **s == label).count();
    println!("Symbol:           {}", settings.data.symbol);
    println!(
        "Signals:          {} buy / {} sell / {} hold",
        count(Signal::Buy),
        count(Signal::Sell),
        count(Signal::Hold)
    );
    print_result(&result);
    Ok(())
}

fn print_result(result: &BacktestResult) {
    let stats = TradeStats::compute(&result.trades);

    println!("\n=== Backtest Results ===");
    println!("Starting Capital: {:.2}", result.starting_capital);
    println!("Final Value:      {:.2}", result.final_value);
    println!("ROI:              {:.2}%", result.roi);
    println!("Max Drawdown:     -{:.2}%", result.max_drawdown);
    println!("Total Trades:     {}", result.trade_count);
    println!("Win Rate:         {:.1}%", result.win_rate);
    if result.trade_count > 0 {
        println!("Avg Trade:        {:.2}%", stats.avg_return);
        println!("Best Trade:       {:.2}%", stats.best_return);
        println!("Worst Trade:      {:.2}%", stats.worst_return);
    }
}

fn print_settings(settings: &RunSettings) {
    let data = &settings.data;
    let fmt_date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());

    println!("Symbol:           {}", data.symbol);
    println!("Data dir:         {}", data.dir.display());
    println!(
        "Date range:       {} .. {}",
        fmt_date(data.start_date),
        fmt_date(data.end_date)
    );
    println!(
        "Voting rules:     {}",
        settings
            .voting
            .enabled_rules()
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Starting capital: {:.2}",
        settings.backtest.starting_capital
    );
}

fn print_symbols(market: Option<Market>) {
    for (market, listing) in catalog::listings(market) {
        println!("{:<8} {:<10} {}", market, listing.symbol, listing.name);
    }
}
