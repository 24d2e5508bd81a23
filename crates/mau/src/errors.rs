use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MauError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {cause}")]
    Provider { cause: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl MauError {
    pub fn provider<S: Into<String>>(cause: S) -> Self {
        MauError::Provider {
            cause: cause.into(),
        }
    }
}

impl From<reqwest::Error> for MauError {
    fn from(err: reqwest::Error) -> Self {
        MauError::provider(err.to_string())
    }
}

impl From<serde_json::Error> for MauError {
    fn from(err: serde_json::Error) -> Self {
        MauError::provider(format!("Malformed response: {}", err))
    }
}

pub type MauResult<T> = Result<T, MauError>;
