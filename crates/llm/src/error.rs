use common::{ConfigError, NautilexError, UpstreamError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Inference API key is not configured")]
    MissingApiKey,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode inference response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Inference response contained no text")]
    EmptyResponse,

    #[error("No {expected} found in model output")]
    Unparseable { expected: &'static str },

    #[error("Mock provider has no scripted responses left")]
    MockExhausted,
}

pub type LlmResult<T> = Result<T, LlmError>;

impl From<LlmError> for NautilexError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => NautilexError::Configuration(
                ConfigError::MissingVariable("ANTHROPIC_API_KEY".to_string()),
            ),
            LlmError::Upstream(upstream) => NautilexError::Upstream(upstream),
            LlmError::Decode(e) => NautilexError::Serialization(e),
            other => NautilexError::Internal(other.to_string()),
        }
    }
}
