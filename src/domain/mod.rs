//! Core domain types and logic.

pub mod asset;
pub mod backtest;
pub mod batch;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod reaggregate;
pub mod record;
pub mod signal;
pub mod strategy;
pub mod summary;
pub mod timestamp;
pub mod trade;
pub mod window;
