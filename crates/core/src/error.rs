use thiserror::Error;

pub type KollektorResult<T> = Result<T, KollektorError>;

#[derive(Error, Debug)]
pub enum KollektorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Document error: {0}")]
    Document(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for KollektorError {
    fn from(err: config::ConfigError) -> Self {
        KollektorError::Config(err.to_string())
    }
}
