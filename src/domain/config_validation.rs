//! Configuration validation.
//!
//! Checks every batch key before any unit runs, so a typo fails fast instead
//! of after an hour of simulations.

use std::str::FromStr;

use crate::domain::asset::{parse_intervals, split_list};
use crate::domain::error::BackscanError;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;

pub const BATCH_SECTION: &str = "batch";
pub const ASSET_SECTION_PREFIX: &str = "asset:";

pub fn validate_batch_config(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    validate_initial_capital(config)?;
    validate_fee(config)?;
    validate_intervals(config)?;
    validate_strategies(config)?;
    validate_workers(config)?;
    validate_paths(config)?;
    validate_assets(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BackscanError {
    BackscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse an optional numeric key; a present but unparseable value is an error
/// rather than a silent fallback to the default.
pub fn parse_optional<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, BackscanError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a valid number", raw.trim()))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    if let Some(value) = parse_optional::<f64>(config, BATCH_SECTION, "initial_capital")? {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(
                BATCH_SECTION,
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

/// Round-trip fee in percent must lie in `[0, 100)`.
pub fn check_fee_pct(section: &str, key: &str, value: f64) -> Result<(), BackscanError> {
    if (0.0..100.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(section, key, format!("{} must be in [0, 100)", key)))
    }
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    if let Some(value) = parse_optional::<f64>(config, BATCH_SECTION, "round_trip_fee_pct")? {
        check_fee_pct(BATCH_SECTION, "round_trip_fee_pct", value)?;
    }
    Ok(())
}

fn validate_intervals(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    if let Some(raw) = config.get_string(BATCH_SECTION, "intervals") {
        let intervals = parse_intervals(&raw)?;
        if intervals.is_empty() {
            return Err(invalid(BATCH_SECTION, "intervals", "no intervals listed"));
        }
    }
    Ok(())
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    if let Some(raw) = config.get_string(BATCH_SECTION, "strategies") {
        let names = split_list(&raw);
        if names.is_empty() {
            return Err(invalid(BATCH_SECTION, "strategies", "no strategies listed"));
        }
        for name in names {
            StrategyKind::from_str(&name)?;
        }
    }
    Ok(())
}

fn validate_workers(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    if let Some(value) = parse_optional::<i64>(config, BATCH_SECTION, "workers")? {
        if value < 0 {
            return Err(invalid(
                BATCH_SECTION,
                "workers",
                "workers must be 0 (automatic) or more",
            ));
        }
    }
    Ok(())
}

fn validate_paths(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    for key in ["data_dir", "output"] {
        if let Some(value) = config.get_string(BATCH_SECTION, key) {
            if value.trim().is_empty() {
                return Err(invalid(BATCH_SECTION, key, format!("{} must not be empty", key)));
            }
        }
    }
    Ok(())
}

/// Ticker part of an `[asset:TICKER]` section name.
pub fn asset_ticker(section: &str) -> Option<&str> {
    section
        .strip_prefix(ASSET_SECTION_PREFIX)
        .map(str::trim)
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), BackscanError> {
    let sections = config.sections();
    let mut tickers = Vec::new();
    for section in &sections {
        let Some(ticker) = asset_ticker(section) else {
            continue;
        };
        if ticker.is_empty() {
            return Err(invalid(section, "ticker", "asset section needs a ticker"));
        }
        if tickers.contains(&ticker) {
            return Err(invalid(section, "ticker", format!("duplicate asset {}", ticker)));
        }
        tickers.push(ticker);
    }
    if tickers.is_empty() {
        return Err(BackscanError::ConfigMissing {
            section: format!("{}TICKER", ASSET_SECTION_PREFIX),
            key: "name".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// In-memory config keyed by (section, key), sections kept in insert order.
    struct MapConfig {
        order: Vec<String>,
        values: BTreeMap<(String, String), String>,
    }

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let mut order = Vec::new();
            let mut values = BTreeMap::new();
            for (section, key, value) in entries {
                if !order.iter().any(|s| s == section) {
                    order.push(section.to_string());
                }
                if !key.is_empty() {
                    values.insert((section.to_string(), key.to_string()), value.to_string());
                }
            }
            Self { order, values }
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }
        fn sections(&self) -> Vec<String> {
            self.order.clone()
        }
    }

    fn valid() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("batch", "initial_capital", "1000000"),
            ("batch", "round_trip_fee_pct", "0.1"),
            ("batch", "intervals", "1h,4h"),
            ("batch", "strategies", "rsi_v1,ema_cross"),
            ("asset:KRW-BTC", "name", "Bitcoin"),
        ]
    }

    fn with(overrides: &[(&'static str, &'static str, &'static str)]) -> MapConfig {
        let mut entries = valid();
        for o in overrides {
            entries.retain(|(s, k, _)| !(s == &o.0 && k == &o.1));
            entries.push(*o);
        }
        MapConfig::new(&entries)
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate_batch_config(&MapConfig::new(&valid())).is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        let config = MapConfig::new(&[("asset:AAPL", "", "")]);
        assert!(validate_batch_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_positive_capital() {
        let err = validate_batch_config(&with(&[("batch", "initial_capital", "0")])).unwrap_err();
        assert!(matches!(err, BackscanError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn rejects_garbage_number() {
        let err = validate_batch_config(&with(&[("batch", "initial_capital", "lots")])).unwrap_err();
        assert!(matches!(err, BackscanError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn rejects_negative_fee() {
        let err =
            validate_batch_config(&with(&[("batch", "round_trip_fee_pct", "-0.1")])).unwrap_err();
        assert!(matches!(err, BackscanError::ConfigInvalid { key, .. } if key == "round_trip_fee_pct"));
    }

    #[test]
    fn fee_pct_range() {
        assert!(check_fee_pct("batch", "round_trip_fee_pct", 0.0).is_ok());
        assert!(check_fee_pct("batch", "round_trip_fee_pct", 99.9).is_ok());
        for bad in [100.0, 150.0, -0.01, f64::NAN] {
            let err = check_fee_pct("reaggregate", "fee-pct", bad).unwrap_err();
            assert!(matches!(err, BackscanError::ConfigInvalid { key, .. } if key == "fee-pct"));
        }
    }

    #[test]
    fn rejects_unknown_interval_and_strategy() {
        let err = validate_batch_config(&with(&[("batch", "intervals", "1h,3h")])).unwrap_err();
        assert!(matches!(err, BackscanError::UnknownInterval(s) if s == "3h"));

        let err = validate_batch_config(&with(&[("batch", "strategies", "rsi_v1,macd")])).unwrap_err();
        assert!(matches!(err, BackscanError::UnknownStrategy(s) if s == "macd"));
    }

    #[test]
    fn rejects_negative_workers() {
        let err = validate_batch_config(&with(&[("batch", "workers", "-2")])).unwrap_err();
        assert!(matches!(err, BackscanError::ConfigInvalid { key, .. } if key == "workers"));
    }

    #[test]
    fn requires_an_asset() {
        let config = MapConfig::new(&[("batch", "intervals", "1h")]);
        assert!(matches!(
            validate_batch_config(&config),
            Err(BackscanError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn asset_ticker_strips_prefix() {
        assert_eq!(asset_ticker("asset:KRW-ETH"), Some("KRW-ETH"));
        assert_eq!(asset_ticker("batch"), None);
    }
}
