use thiserror::Error;

use crate::syncer::SyncPhase;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    ConfigError(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Sync cancelled")]
    Cancelled,

    /// A fatal error annotated with the phase it happened in.
    #[error("{context}: {source}")]
    Phase {
        phase: SyncPhase,
        context: &'static str,
        #[source]
        source: Box<SyncError>,
    },
}

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    SchemaViolation,
    Fetch,
    Cancelled,
}

impl SyncError {
    pub fn during(self, phase: SyncPhase, context: &'static str) -> Self {
        SyncError::Phase {
            phase,
            context,
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ConfigError(_) => ErrorKind::Config,
            SyncError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::Phase { source, .. } => source.kind(),
            SyncError::ApiError(_)
            | SyncError::RateLimitExceeded(_)
            | SyncError::NetworkError(_)
            | SyncError::JsonError(_)
            | SyncError::AuthError(_)
            | SyncError::NotFound(_) => ErrorKind::Fetch,
        }
    }

    /// Phase the error was raised in, if it was wrapped by the orchestrator.
    pub fn phase(&self) -> Option<SyncPhase> {
        match self {
            SyncError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
