// src/health/error.rs

/// Errors reported by the registry and by path addressing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    #[error("Cannot register check at '{path}': {reason}")]
    InvalidRegistration { path: String, reason: String },

    #[error("No check registered at '{0}'")]
    NotFound(String),

    #[error("Invalid check path '{0}'")]
    InvalidPath(String),
}

impl HealthError {
    pub(crate) fn invalid_registration(path: &str, reason: impl Into<String>) -> Self {
        HealthError::InvalidRegistration {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// How a procedure can end without producing a [`Status`](super::Status).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcedureError {
    /// The procedure ran and reported its dependency as unhealthy.
    #[error("{0}")]
    Failed(String),

    /// The procedure itself broke before it could report anything.
    #[error("{0}")]
    Raised(String),
}

impl ProcedureError {
    pub fn failed(cause: impl Into<String>) -> Self {
        ProcedureError::Failed(cause.into())
    }

    pub fn raised(cause: impl Into<String>) -> Self {
        ProcedureError::Raised(cause.into())
    }
}

impl From<anyhow::Error> for ProcedureError {
    fn from(err: anyhow::Error) -> Self {
        ProcedureError::Raised(err.to_string())
    }
}
