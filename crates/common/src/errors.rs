use thiserror::Error;

/// Top-level error hierarchy shared by every nautilex crate
#[derive(Error, Debug)]
pub enum NautilexError {
    // === System ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Input and configuration ===
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    // === External services ===
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A remote service answered with a status we did not expect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} returned HTTP {status}: {body}")]
pub struct UpstreamError {
    pub service: String,
    pub status: u16,
    pub body: String,
}

impl UpstreamError {
    pub fn new(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status,
            body: body.into(),
        }
    }
}

/// Validation errors for inbound events, filters and migration jobs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid format: {field} - expected {expected}")]
    InvalidFormat { field: String, expected: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl NautilexError {
    /// HTTP-equivalent status for transport envelopes
    pub fn status_code(&self) -> u16 {
        match self {
            NautilexError::Validation(_) => 400,
            NautilexError::Unauthenticated(_) => 401,
            NautilexError::NotFound(_) => 404,
            NautilexError::NotImplemented(_) => 501,
            NautilexError::Upstream(e) if e.status == 404 => 404,
            NautilexError::Upstream(_) => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            NautilexError::Io(_) => "IO_ERROR",
            NautilexError::Serialization(_) => "SERIALIZATION_ERROR",
            NautilexError::Validation(_) => "VALIDATION_ERROR",
            NautilexError::Configuration(_) => "CONFIG_ERROR",
            NautilexError::Upstream(_) => "UPSTREAM_ERROR",
            NautilexError::Unauthenticated(_) => "UNAUTHENTICATED",
            NautilexError::NotFound(_) => "NOT_FOUND",
            NautilexError::NotImplemented(_) => "NOT_IMPLEMENTED",
            NautilexError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type NautilexResult<T> = Result<T, NautilexError>;
