pub mod config;
pub mod errors;
pub mod structured_logging;

pub use config::{AppConfig, DocDbConfig, GithubConfig, InferenceConfig, TargetEnv};
pub use errors::{ConfigError, NautilexError, NautilexResult, UpstreamError, ValidationError};
pub use structured_logging::{
    init_structured_logging, ExecutionContext, LoggingConfig, OperationTimer, StructuredLogEntry,
};
