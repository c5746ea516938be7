use common::NautilexError;
use docdb::DocDbError;
use github::GithubError;
use llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("No records matched issue #{issue}, even after a simplified query")]
    NoMatchingRecords { issue: u64 },

    #[error("Model produced an unusable query: {0}")]
    InvalidQuery(String),

    #[error("Model produced an empty script for issue #{issue}")]
    EmptyScript { issue: u64 },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Github(#[from] GithubError),

    #[error(transparent)]
    Store(#[from] DocDbError),
}

pub type AgentResult<T> = Result<T, AgentError>;

impl From<AgentError> for NautilexError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Llm(e) => e.into(),
            AgentError::Github(e) => e.into(),
            AgentError::Store(e) => e.into(),
            AgentError::NoMatchingRecords { .. } => NautilexError::NotFound(err.to_string()),
            other => NautilexError::Internal(other.to_string()),
        }
    }
}
