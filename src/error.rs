use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("insufficient data for {context}: need {needed} observations, have {available}")]
    DataInsufficient {
        context: String,
        needed: usize,
        available: usize,
    },

    #[error("model fit error: {0}")]
    ModelFit(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("signal source error for '{series}': {reason}")]
    Source { series: String, reason: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    pub fn insufficient(context: impl Into<String>, needed: usize, available: usize) -> Self {
        Self::DataInsufficient {
            context: context.into(),
            needed,
            available,
        }
    }

    /// True for the two failure kinds the orchestrator recovers with a flat forecast.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataInsufficient { .. } | Self::ModelFit(_))
    }
}

pub type ForecastResult<T> = std::result::Result<T, ForecastError>;
