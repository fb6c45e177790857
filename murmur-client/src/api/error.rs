use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Message supplied by the backend, if the error carries one
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Api(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::BadRequest(msg)
                if !msg.trim().is_empty() =>
            {
                Some(msg.as_str())
            }
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
