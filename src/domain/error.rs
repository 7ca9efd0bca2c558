//! Domain error types.

/// Top-level error type for backscan.
#[derive(Debug, thiserror::Error)]
pub enum BackscanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown interval: {0}")]
    UnknownInterval(String),

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {ticker} ({interval})")]
    NoData { ticker: String, interval: String },

    #[error("insufficient data for {ticker} ({interval}): have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        interval: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid period '{input}': {reason}")]
    InvalidPeriod { input: String, reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackscanError {
    /// True for outcomes the batch treats as "skip this unit" rather than a fault.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            BackscanError::NoData { .. }
                | BackscanError::InsufficientData { .. }
                | BackscanError::DataSource { .. }
        )
    }
}

impl From<&BackscanError> for std::process::ExitCode {
    fn from(err: &BackscanError) -> Self {
        let code: u8 = match err {
            BackscanError::Io(_) => 1,
            BackscanError::ConfigParse { .. }
            | BackscanError::ConfigMissing { .. }
            | BackscanError::ConfigInvalid { .. }
            | BackscanError::UnknownStrategy(_)
            | BackscanError::UnknownInterval(_) => 2,
            BackscanError::DataSource { .. }
            | BackscanError::NoData { .. }
            | BackscanError::InsufficientData { .. } => 5,
            BackscanError::InvalidPeriod { .. } => 6,
            BackscanError::Serialization(_) => 7,
        };
        std::process::ExitCode::from(code)
    }
}
