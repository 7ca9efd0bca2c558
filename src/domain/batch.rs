//! Batch orchestration over the asset × interval × strategy cross-product.
//!
//! Each (asset, interval) unit fetches its bars once and runs every configured
//! strategy on them. Units are independent and run on a rayon pool; records
//! come back in config order regardless of scheduling.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::domain::asset::{Asset, Interval};
use crate::domain::backtest::{run_backtest, BacktestConfig, MIN_BARS};
use crate::domain::error::BackscanError;
use crate::domain::indicator::compute_indicators;
use crate::domain::metrics::INITIAL_CAPITAL;
use crate::domain::ohlcv::Bar;
use crate::domain::record::{ResultRecord, UnitOutcome};
use crate::domain::signal::current_signal;
use crate::domain::strategy::StrategyKind;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub initial_capital: f64,
    /// Round-trip fee as a fraction (0.001 = 0.1%); applied by reporting only.
    pub fee_fraction: f64,
    pub intervals: Vec<Interval>,
    pub strategies: Vec<StrategyKind>,
    pub assets: Vec<Asset>,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    /// 0 lets rayon pick.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            initial_capital: INITIAL_CAPITAL,
            fee_fraction: 0.001,
            intervals: Interval::ALL.to_vec(),
            strategies: StrategyKind::ALL.to_vec(),
            assets: Vec::new(),
            data_dir: PathBuf::from("data"),
            output: PathBuf::from("analysis_results.json"),
            workers: 0,
        }
    }
}

impl BatchConfig {
    fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            min_bars: MIN_BARS,
        }
    }
}

/// Why a unit produced no records.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedUnit {
    pub ticker: String,
    pub interval: Interval,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub units: usize,
    pub skipped: Vec<SkippedUnit>,
}

/// Format of the batch timestamp stamped on every record.
pub const BATCH_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Run one strategy over one bar series and label the result.
pub fn evaluate_unit(
    asset: &Asset,
    interval: Interval,
    strategy: StrategyKind,
    bars: &[Bar],
    config: &BacktestConfig,
    timestamp: &str,
) -> Result<ResultRecord, BackscanError> {
    let policy = strategy.policy();
    let frame = compute_indicators(bars, &policy.indicators());
    let run = run_backtest(bars, &frame, policy.as_ref(), config).map_err(|e| {
        BackscanError::InsufficientData {
            ticker: asset.ticker.clone(),
            interval: interval.to_string(),
            bars: e.bars,
            minimum: e.minimum,
        }
    })?;

    let signal = current_signal(policy.as_ref(), bars, &frame);
    let last_price = bars.last().map(|b| b.close).unwrap_or_default();
    debug!(
        ticker = %asset.ticker,
        %interval,
        %strategy,
        trades = run.summary.trade_count,
        return_pct = run.summary.return_pct,
        "unit evaluated"
    );

    Ok(ResultRecord::new(
        asset,
        interval,
        strategy,
        timestamp,
        UnitOutcome {
            summary: run.summary,
            trade_history: run.trades,
            current_signal: signal,
            last_price,
        },
    ))
}

fn run_unit(
    data_port: &dyn DataPort,
    config: &BatchConfig,
    asset: &Asset,
    interval: Interval,
    timestamp: &str,
) -> Result<Vec<ResultRecord>, BackscanError> {
    let bars = data_port.fetch_bars(&asset.ticker, interval)?;
    if bars.is_empty() {
        return Err(BackscanError::NoData {
            ticker: asset.ticker.clone(),
            interval: interval.to_string(),
        });
    }
    let backtest = config.backtest_config();
    config
        .strategies
        .iter()
        .map(|&strategy| evaluate_unit(asset, interval, strategy, &bars, &backtest, timestamp))
        .collect()
}

/// Run every configured unit. Skippable failures (no data, too little
/// history, data source errors) are logged and reported; anything else
/// aborts the batch.
pub fn run_batch(
    data_port: &dyn DataPort,
    config: &BatchConfig,
    now: NaiveDateTime,
) -> Result<(Vec<ResultRecord>, BatchReport), BackscanError> {
    let timestamp = now.format(BATCH_TIMESTAMP_FORMAT).to_string();
    let units: Vec<(&Asset, Interval)> = config
        .assets
        .iter()
        .flat_map(|asset| config.intervals.iter().map(move |&interval| (asset, interval)))
        .collect();
    info!(
        assets = config.assets.len(),
        intervals = config.intervals.len(),
        strategies = config.strategies.len(),
        "starting batch of {} units",
        units.len()
    );

    let work = || -> Vec<Result<Vec<ResultRecord>, BackscanError>> {
        units
            .par_iter()
            .map(|&(asset, interval)| run_unit(data_port, config, asset, interval, &timestamp))
            .collect()
    };
    let outcomes = if config.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| BackscanError::ConfigInvalid {
                section: "batch".to_string(),
                key: "workers".to_string(),
                reason: e.to_string(),
            })?
            .install(work)
    } else {
        work()
    };

    let mut records = Vec::new();
    let mut report = BatchReport {
        units: units.len(),
        skipped: Vec::new(),
    };
    for (&(asset, interval), outcome) in units.iter().zip(outcomes) {
        match outcome {
            Ok(unit_records) => {
                info!(ticker = %asset.ticker, %interval, records = unit_records.len(), "unit done");
                records.extend(unit_records);
            }
            Err(e) if e.is_skippable() => {
                warn!(ticker = %asset.ticker, %interval, "skipping unit: {}", e);
                report.skipped.push(SkippedUnit {
                    ticker: asset.ticker.clone(),
                    interval,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        records = records.len(),
        skipped = report.skipped.len(),
        "batch complete"
    );
    Ok((records, report))
}
