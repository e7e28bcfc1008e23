use thiserror::Error;

pub type AdboardResult<T> = Result<T, AdboardError>;

#[derive(Error, Debug)]
pub enum AdboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record source error: {0}")]
    Source(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AdboardError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
