//! Result record: one per (asset, interval, strategy) unit.

use serde::{Deserialize, Serialize};

use crate::domain::asset::{Asset, Interval, DEFAULT_CATEGORY};
use crate::domain::metrics::{aggregate, aggregate_with_fee, Summary};
use crate::domain::reaggregate::filter_trades;
use crate::domain::signal::Signal;
use crate::domain::strategy::StrategyKind;
use crate::domain::trade::TradeEvent;
use crate::domain::window::Window;

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub asset: String,
    pub ticker: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub interval: Interval,
    pub strategy: StrategyKind,
    /// Batch timestamp shared by every record of one run.
    pub timestamp: String,
    #[serde(alias = "return")]
    pub return_pct: f64,
    #[serde(alias = "win_rate")]
    pub win_rate_pct: f64,
    #[serde(alias = "trades")]
    pub trade_count: usize,
    #[serde(default)]
    pub trade_history: Vec<TradeEvent>,
    pub current_signal: String,
    pub last_price: f64,
}

/// What one simulation produced, before it is labelled with its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub summary: Summary,
    pub trade_history: Vec<TradeEvent>,
    pub current_signal: Signal,
    pub last_price: f64,
}

impl ResultRecord {
    pub fn new(
        asset: &Asset,
        interval: Interval,
        strategy: StrategyKind,
        timestamp: impl Into<String>,
        outcome: UnitOutcome,
    ) -> Self {
        ResultRecord {
            asset: asset.name.clone(),
            ticker: asset.ticker.clone(),
            category: asset.category.clone(),
            interval,
            strategy,
            timestamp: timestamp.into(),
            return_pct: outcome.summary.return_pct,
            win_rate_pct: outcome.summary.win_rate_pct,
            trade_count: outcome.summary.trade_count,
            trade_history: outcome.trade_history,
            current_signal: outcome.current_signal.to_string(),
            last_price: outcome.last_price,
        }
    }

    /// Replay of the stored trade history.
    pub fn replay(&self, initial_capital: f64) -> Summary {
        aggregate(initial_capital, &self.trade_history)
    }

    /// Return of the stored history with `fee_fraction` taken on every round
    /// trip.
    pub fn net_return_pct(&self, initial_capital: f64, fee_fraction: f64) -> f64 {
        aggregate_with_fee(initial_capital, &self.trade_history, fee_fraction).return_pct
    }

    /// Copy restricted to `window`: trade history filtered and metrics
    /// recomputed from it, so the copy still replays to its own numbers.
    pub fn reaggregated(&self, window: &Window, initial_capital: f64) -> Self {
        let kept: Vec<TradeEvent> = filter_trades(&self.trade_history, window)
            .into_iter()
            .cloned()
            .collect();
        let summary = aggregate(initial_capital, &kept);
        ResultRecord {
            return_pct: summary.return_pct,
            win_rate_pct: summary.win_rate_pct,
            trade_count: summary.trade_count,
            trade_history: kept,
            ..self.clone()
        }
    }
}

/// Record selection; `None` fields match everything. `asset` matches either
/// the display name or the ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub strategy: Option<StrategyKind>,
    pub category: Option<String>,
    pub asset: Option<String>,
    pub interval: Option<Interval>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ResultRecord) -> bool {
        self.strategy.is_none_or(|s| record.strategy == s)
            && self.interval.is_none_or(|i| record.interval == i)
            && self
                .category
                .as_deref()
                .is_none_or(|c| record.category == c)
            && self
                .asset
                .as_deref()
                .is_none_or(|a| record.asset == a || record.ticker == a)
    }

    pub fn apply(&self, records: Vec<ResultRecord>) -> Vec<ResultRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Records ordered by return, best first. Ties keep their input order.
pub fn ranked_by_return(records: &[ResultRecord]) -> Vec<&ResultRecord> {
    let mut ranked: Vec<&ResultRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.return_pct.total_cmp(&a.return_pct));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::INITIAL_CAPITAL;
    use crate::domain::window::CalendarPeriod;
    use approx::assert_relative_eq;

    const LEGACY: &str = r#"{
        "asset": "비트코인",
        "ticker": "KRW-BTC",
        "interval": "1시간",
        "strategy": "RSI v2 (Smart)",
        "timestamp": "2024-07-01T10:00:00.123456",
        "return": 4.5,
        "win_rate": 50.0,
        "trades": 2,
        "trade_history": [
            {"time": "2024-03-01 10:00:00+09:00", "type": "Exit", "pnl": 0.1, "reason": "Take Profit (RSI > 70)"},
            {"time": "2024-05-01 10:00:00+09:00", "type": "Exit", "pnl": -0.05, "reason": "Stop Loss"}
        ],
        "current_signal": "Hold",
        "last_price": 85000000.0
    }"#;

    #[test]
    fn reads_legacy_record() {
        let record: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        assert_eq!(record.interval, Interval::H1);
        assert_eq!(record.strategy, StrategyKind::RsiV2);
        assert_eq!(record.category, "Other");
        assert_eq!(record.trade_count, 2);
        assert_relative_eq!(record.replay(INITIAL_CAPITAL).return_pct, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn writes_current_key_names() {
        let record: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["interval"], "1h");
        assert_eq!(json["return_pct"], 4.5);
        assert_eq!(json["trade_history"][0]["pnl_fraction"], 0.1);
        assert!(json.get("return").is_none());
    }

    #[test]
    fn reaggregated_copy_replays_to_its_own_metrics() {
        let record: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        let window = "2024-03".parse::<CalendarPeriod>().unwrap().window().unwrap();
        let narrowed = record.reaggregated(&window, INITIAL_CAPITAL);
        assert_eq!(narrowed.trade_count, 1);
        assert_eq!(narrowed.trade_history.len(), 1);
        assert_relative_eq!(narrowed.return_pct, 10.0, epsilon = 1e-9);
        assert_eq!(narrowed.replay(INITIAL_CAPITAL).return_pct, narrowed.return_pct);
        assert_eq!(narrowed.asset, record.asset);
    }

    #[test]
    fn net_return_takes_fee_per_trade() {
        let record: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        let expected = (1.1 * 0.999 * 0.95 * 0.999 - 1.0) * 100.0;
        assert_relative_eq!(record.net_return_pct(INITIAL_CAPITAL, 0.001), expected, epsilon = 1e-9);
        assert_relative_eq!(record.net_return_pct(INITIAL_CAPITAL, 0.0), record.return_pct, epsilon = 1e-9);
    }

    #[test]
    fn filter_matches_name_or_ticker() {
        let record: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        assert!(RecordFilter::default().matches(&record));

        let by_ticker = RecordFilter {
            asset: Some("KRW-BTC".into()),
            strategy: Some(StrategyKind::RsiV2),
            ..RecordFilter::default()
        };
        assert!(by_ticker.matches(&record));
        let by_name = RecordFilter {
            asset: Some("비트코인".into()),
            interval: Some(Interval::H1),
            ..RecordFilter::default()
        };
        assert!(by_name.matches(&record));

        let other_category = RecordFilter {
            category: Some("Coin".into()),
            ..RecordFilter::default()
        };
        assert!(!other_category.matches(&record));
        let other_interval = RecordFilter {
            interval: Some(Interval::D1),
            ..RecordFilter::default()
        };
        assert!(other_interval.apply(vec![record]).is_empty());
    }

    #[test]
    fn ranking_is_best_return_first() {
        let base: ResultRecord = serde_json::from_str(LEGACY).unwrap();
        let records: Vec<ResultRecord> = [1.5, -3.0, 7.25, 1.5]
            .into_iter()
            .enumerate()
            .map(|(i, r)| ResultRecord {
                return_pct: r,
                ticker: format!("T{}", i),
                ..base.clone()
            })
            .collect();
        let order: Vec<&str> = ranked_by_return(&records)
            .iter()
            .map(|r| r.ticker.as_str())
            .collect();
        assert_eq!(order, vec!["T2", "T0", "T3", "T1"]);
    }
}
