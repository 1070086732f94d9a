use thiserror::Error;

pub type UpkeepResult<T> = Result<T, UpkeepError>;

#[derive(Error, Debug)]
pub enum UpkeepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl UpkeepError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}
