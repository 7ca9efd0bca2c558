//! CLI definition and dispatch.

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_result_adapter::JsonResultAdapter;
use crate::domain::asset::{parse_intervals, split_list, Asset, Interval, DEFAULT_CATEGORY};
use crate::domain::backtest::BacktestConfig;
use crate::domain::batch::{evaluate_unit, run_batch, BatchConfig, BATCH_TIMESTAMP_FORMAT};
use crate::domain::config_validation::{
    asset_ticker, check_fee_pct, parse_optional, validate_batch_config, BATCH_SECTION,
};
use crate::domain::error::BackscanError;
use crate::domain::metrics::INITIAL_CAPITAL;
use crate::domain::record::{ranked_by_return, RecordFilter, ResultRecord};
use crate::domain::strategy::StrategyKind;
use crate::domain::summary::PortfolioSummary;
use crate::domain::window::{
    available_periods, parse_trailing_days, CalendarPeriod, PeriodUnit, WindowSpec,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::ResultPort;

/// Default round-trip fee in percent.
const DEFAULT_FEE_PCT: f64 = 0.1;

#[derive(Parser, Debug)]
#[command(name = "backscan", about = "Batch backtester for rule-based trading strategies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every asset, interval and strategy in a batch config
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[batch] output`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a single strategy over one CSV file and print the record
    Backtest {
        #[arg(long)]
        csv: PathBuf,
        #[arg(short, long)]
        strategy: String,
        /// Defaults to the file stem
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long, default_value = "1d")]
        interval: String,
    },
    /// Recompute every record's metrics over a time window
    Reaggregate {
        #[arg(short, long)]
        input: PathBuf,
        /// Trailing window: 1d, 1m, 6m, 1y or Nd
        #[arg(long, conflicts_with = "period", required_unless_present = "period")]
        last: Option<String>,
        /// Calendar period: YYYY-MM-DD, YYYY-MM, "YYYY H1" or YYYY
        #[arg(long)]
        period: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Round-trip fee in percent for net returns and the summary
        #[arg(long, default_value_t = DEFAULT_FEE_PCT)]
        fee_pct: f64,
        /// Keep only this strategy (slug or display name)
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Keep only this asset, by name or ticker
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// List the calendar periods covered by a results file
    Periods {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "month")]
        unit: String,
    },
    /// Validate a batch configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze { config, output } => run_analyze(&config, output.as_deref()),
        Command::Backtest {
            csv,
            strategy,
            ticker,
            interval,
        } => run_single_backtest(&csv, &strategy, ticker.as_deref(), &interval),
        Command::Reaggregate {
            input,
            last,
            period,
            output,
            fee_pct,
            strategy,
            category,
            asset,
            interval,
        } => record_filter(strategy.as_deref(), category, asset, interval.as_deref()).and_then(
            |filter| {
                run_reaggregate(
                    &input,
                    last.as_deref(),
                    period.as_deref(),
                    output.as_deref(),
                    fee_pct,
                    &filter,
                )
            },
        ),
        Command::Periods { input, unit } => run_periods(&input, &unit),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BackscanError> {
    FileConfigAdapter::from_file(path).map_err(|e| BackscanError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Build a batch config from an already validated `ConfigPort`.
pub fn build_batch_config(config: &dyn ConfigPort) -> Result<BatchConfig, BackscanError> {
    let defaults = BatchConfig::default();

    let intervals = match config.get_string(BATCH_SECTION, "intervals") {
        Some(raw) => parse_intervals(&raw)?,
        None => defaults.intervals,
    };
    let strategies = match config.get_string(BATCH_SECTION, "strategies") {
        Some(raw) => split_list(&raw)
            .iter()
            .map(|s| StrategyKind::from_str(s))
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.strategies,
    };
    let fee_pct =
        parse_optional::<f64>(config, BATCH_SECTION, "round_trip_fee_pct")?.unwrap_or(DEFAULT_FEE_PCT);
    let workers = parse_optional::<i64>(config, BATCH_SECTION, "workers")?.unwrap_or(0);

    let assets = config
        .sections()
        .iter()
        .filter_map(|section| {
            let ticker = asset_ticker(section)?;
            let name = config
                .get_string(section, "name")
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| ticker.to_string());
            let category = config
                .get_string(section, "category")
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            Some(Asset::new(name, ticker, category))
        })
        .collect();

    Ok(BatchConfig {
        initial_capital: parse_optional(config, BATCH_SECTION, "initial_capital")?
            .unwrap_or(defaults.initial_capital),
        fee_fraction: fee_pct / 100.0,
        intervals,
        strategies,
        assets,
        data_dir: config
            .get_string(BATCH_SECTION, "data_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir),
        output: config
            .get_string(BATCH_SECTION, "output")
            .map(PathBuf::from)
            .unwrap_or(defaults.output),
        workers: usize::try_from(workers).unwrap_or(0),
    })
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn run_analyze(config_path: &Path, output: Option<&Path>) -> Result<(), BackscanError> {
    info!("loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_batch_config(&adapter)?;
    let mut batch = build_batch_config(&adapter)?;
    if let Some(path) = output {
        batch.output = path.to_path_buf();
    }

    let data_port = CsvAdapter::new(batch.data_dir.clone());
    let (records, report) = run_batch(&data_port, &batch, now())?;

    let sink = JsonResultAdapter::new(batch.output.clone());
    sink.save(&records)?;
    info!(
        "wrote {} records to {} ({} of {} units skipped)",
        records.len(),
        batch.output.display(),
        report.skipped.len(),
        report.units
    );

    print_records(&records, batch.initial_capital, batch.fee_fraction);
    print_summary(&PortfolioSummary::from_records(
        &records,
        batch.initial_capital,
        batch.fee_fraction,
    ));
    Ok(())
}

fn run_single_backtest(
    csv: &Path,
    strategy: &str,
    ticker: Option<&str>,
    interval: &str,
) -> Result<(), BackscanError> {
    let strategy = StrategyKind::from_str(strategy)?;
    let interval = Interval::from_str(interval)?;
    let ticker = ticker
        .map(str::to_string)
        .or_else(|| csv.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let bars = CsvAdapter::read_file(csv)?;
    info!("loaded {} bars from {}", bars.len(), csv.display());

    let asset = Asset::new(ticker.clone(), ticker, DEFAULT_CATEGORY);
    let timestamp = now().format(BATCH_TIMESTAMP_FORMAT).to_string();
    let record = evaluate_unit(
        &asset,
        interval,
        strategy,
        &bars,
        &BacktestConfig::default(),
        &timestamp,
    )?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn window_spec(last: Option<&str>, period: Option<&str>) -> Result<WindowSpec, BackscanError> {
    match (last, period) {
        (Some(last), _) => Ok(WindowSpec::Trailing {
            days: parse_trailing_days(last)?,
        }),
        (None, Some(period)) => Ok(WindowSpec::Calendar(CalendarPeriod::from_str(period)?)),
        (None, None) => Err(BackscanError::InvalidPeriod {
            input: String::new(),
            reason: "either --last or --period is required".to_string(),
        }),
    }
}

fn record_filter(
    strategy: Option<&str>,
    category: Option<String>,
    asset: Option<String>,
    interval: Option<&str>,
) -> Result<RecordFilter, BackscanError> {
    Ok(RecordFilter {
        strategy: strategy.map(StrategyKind::from_str).transpose()?,
        category,
        asset,
        interval: interval.map(Interval::from_str).transpose()?,
    })
}

fn run_reaggregate(
    input: &Path,
    last: Option<&str>,
    period: Option<&str>,
    output: Option<&Path>,
    fee_pct: f64,
    filter: &RecordFilter,
) -> Result<(), BackscanError> {
    check_fee_pct("reaggregate", "fee-pct", fee_pct)?;
    let fee_fraction = fee_pct / 100.0;
    let spec = window_spec(last, period)?;
    let window = spec.resolve(now())?;
    let records = filter.apply(JsonResultAdapter::new(input).load()?);
    info!(
        "re-aggregating {} records over {} ({} to {})",
        records.len(),
        spec,
        window.start,
        window.end
    );

    let windowed: Vec<ResultRecord> = records
        .iter()
        .map(|r| r.reaggregated(&window, INITIAL_CAPITAL))
        .collect();

    if let Some(path) = output {
        JsonResultAdapter::new(path).save(&windowed)?;
        info!("wrote {} records to {}", windowed.len(), path.display());
    }

    print_records(&windowed, INITIAL_CAPITAL, fee_fraction);
    print_summary(&PortfolioSummary::from_records(
        &windowed,
        INITIAL_CAPITAL,
        fee_fraction,
    ));
    Ok(())
}

fn run_periods(input: &Path, unit: &str) -> Result<(), BackscanError> {
    let unit = PeriodUnit::from_str(unit)?;
    let records = JsonResultAdapter::new(input).load()?;
    let periods = available_periods(records.iter().flat_map(|r| r.trade_history.iter()), unit);
    if periods.is_empty() {
        info!("no trade timestamps in {}", input.display());
    }
    for period in periods {
        println!("{period}");
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BackscanError> {
    let adapter = load_config(config_path)?;
    validate_batch_config(&adapter)?;
    let batch = build_batch_config(&adapter)?;
    println!(
        "Configuration OK: {} assets, {} intervals, {} strategies",
        batch.assets.len(),
        batch.intervals.len(),
        batch.strategies.len()
    );
    Ok(())
}

/// Results table, best return first. `Net %` replays each history with the
/// fee taken on every round trip.
fn print_records(records: &[ResultRecord], initial_capital: f64, fee_fraction: f64) {
    println!(
        "{:<16} {:<12} {:<8} {:<16} {:>10} {:>10} {:>8} {:>7}  {}",
        "Asset", "Ticker", "Interval", "Strategy", "Return %", "Net %", "Win %", "Trades", "Signal"
    );
    for r in ranked_by_return(records) {
        println!(
            "{:<16} {:<12} {:<8} {:<16} {:>10.2} {:>10.2} {:>8.2} {:>7}  {}",
            r.asset,
            r.ticker,
            r.interval.to_string(),
            r.strategy.to_string(),
            r.return_pct,
            r.net_return_pct(initial_capital, fee_fraction),
            r.win_rate_pct,
            r.trade_count,
            r.current_signal
        );
    }
}

fn print_summary(summary: &PortfolioSummary) {
    println!();
    println!("Records:            {}", summary.records);
    println!("Total trades:       {}", summary.total_trades);
    println!("Win rate:           {:.2}%", summary.weighted_win_rate_pct);
    println!("Mean return:        {:.2}%", summary.mean_return_pct);
    println!(
        "Before fee:         {:.0} ({:+.2}%)",
        summary.final_amount_before_fee,
        summary.return_before_fee_pct()
    );
    println!(
        "After fee:          {:.0} ({:+.2}%)",
        summary.final_amount_after_fee,
        summary.return_after_fee_pct()
    );
    println!("Fee cost:           {:.0}", summary.fee_cost);
}
