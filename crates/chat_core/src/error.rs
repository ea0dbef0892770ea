use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("translator unreachable: {0}")]
    Transport(String),
    #[error("translator timed out")]
    Timeout,
    #[error("translator returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed translator response: {0}")]
    Malformed(String),
    #[error("translator is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("executor unreachable: {0}")]
    Transport(String),
    #[error("executor timed out")]
    Timeout,
    #[error("executor returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed executor response: {0}")]
    Malformed(String),
    #[error("executor is unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslationError::Timeout
        } else if err.is_decode() {
            TranslationError::Malformed(err.to_string())
        } else {
            TranslationError::Transport(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecutionError::Timeout
        } else if err.is_decode() {
            ExecutionError::Malformed(err.to_string())
        } else {
            ExecutionError::Transport(err.to_string())
        }
    }
}
