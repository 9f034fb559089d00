use thiserror::Error;

#[derive(Debug, Error)]
pub enum FerryError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for FerryError {
    fn from(error: std::io::Error) -> Self {
        FerryError::Storage(error.to_string())
    }
}

impl From<redis::RedisError> for FerryError {
    fn from(error: redis::RedisError) -> Self {
        FerryError::Storage(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FerryError>;
