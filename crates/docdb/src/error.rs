use common::{NautilexError, UpstreamError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocDbError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Write rejected for record {id}: {reason}")]
    WriteFailed { id: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type DocDbResult<T> = Result<T, DocDbError>;

impl From<DocDbError> for NautilexError {
    fn from(err: DocDbError) -> Self {
        match err {
            DocDbError::InvalidFilter(reason) => {
                NautilexError::Validation(ValidationError::invalid("filter", reason))
            }
            DocDbError::InvalidProjection(reason) => {
                NautilexError::Validation(ValidationError::invalid("projection", reason))
            }
            DocDbError::NotFound(id) => NautilexError::NotFound(id),
            DocDbError::Upstream(e) => NautilexError::Upstream(e),
            DocDbError::Decode(e) => NautilexError::Serialization(e),
            other => NautilexError::Internal(other.to_string()),
        }
    }
}
