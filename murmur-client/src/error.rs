use thiserror::Error;

use crate::api::ApiError;

/// Failures surfaced by the sync layer to its callers.
///
/// None of these are fatal: each leaves local state either rolled back or
/// preserved so the user can retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Required fields were blank; nothing was sent
    #[error("Please fill all the fields ({})", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// Backend or storage call failed; eligible for user-initiated retry
    #[error("{0}")]
    Network(String),

    /// Media upload failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Blank comment text
    #[error("Comment text cannot be empty")]
    EmptyInput,

    /// The same operation is already running on this controller
    #[error("Another update is already in progress")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Network error carrying the backend message, or `fallback` when there is none
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        match err {
            ApiError::NotFound(msg) => ClientError::NotFound(msg.clone()),
            other => ClientError::Network(
                other
                    .backend_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback.to_string()),
            ),
        }
    }

    /// Human-readable notice for the UI
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Upload(_))
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::from_api(&err, "Something went wrong")
    }
}
