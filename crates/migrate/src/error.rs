use common::{ConfigError, NautilexError, TargetEnv, ValidationError};
use crate::report::MigrationReport;
use docdb::DocDbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Committed run of '{job}' requires a completed dry run first")]
    DryRunRequired { job: String },

    #[error("No record store configured for {0}")]
    MissingStore(TargetEnv),

    #[error("Unknown migration callback: {0}")]
    UnknownCallback(String),

    #[error("Blob store error at {location}: {reason}")]
    Blob { location: String, reason: String },

    #[error("Invalid id list {path}: {reason}")]
    InvalidIdList { path: String, reason: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] DocDbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Report(#[from] serde_json::Error),

    /// The run itself finished; only persisting its report failed
    #[error(
        "{} run of '{}' finished ({} changed, {} writes, {} failed) but its report was not written to {dir}: {source}",
        report.mode_label(), report.job, report.changed.len(), report.writes, report.failed.len()
    )]
    ReportNotWritten {
        report: Box<MigrationReport>,
        dir: String,
        source: Box<MigrationError>,
    },
}

pub type MigrationResult<T> = Result<T, MigrationError>;

impl MigrationError {
    pub fn blob(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Blob {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

impl From<MigrationError> for NautilexError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::InvalidScope(reason) => {
                NautilexError::Validation(ValidationError::invalid("scope", reason))
            }
            MigrationError::UnknownCallback(name) => {
                NautilexError::Validation(ValidationError::invalid("callback", name))
            }
            MigrationError::MissingStore(env) => NautilexError::Configuration(
                ConfigError::MissingVariable(format!("record store for {}", env)),
            ),
            MigrationError::Store(inner) => inner.into(),
            MigrationError::Io(inner) => NautilexError::Io(inner),
            MigrationError::Report(inner) => NautilexError::Serialization(inner),
            other => NautilexError::Internal(other.to_string()),
        }
    }
}
