use common::{NautilexError, UpstreamError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("GitHub token is not configured")]
    Unauthenticated,

    #[error("Invalid repository identifier '{0}': expected owner/name")]
    InvalidRepo(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type GithubResult<T> = Result<T, GithubError>;

impl From<GithubError> for NautilexError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Unauthenticated => {
                NautilexError::Unauthenticated("GitHub token is not configured".to_string())
            }
            GithubError::InvalidRepo(repo) => {
                NautilexError::Validation(ValidationError::invalid("repository", repo))
            }
            GithubError::NotFound(what) => NautilexError::NotFound(what),
            GithubError::UnexpectedStatus { status, body } => {
                NautilexError::Upstream(UpstreamError::new("github", status, body))
            }
            GithubError::Decode(e) => NautilexError::Serialization(e),
            GithubError::Http(e) => NautilexError::Internal(e.to_string()),
        }
    }
}
