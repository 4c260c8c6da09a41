//! Error types for the policy engine

use admingate_core::CoreError;
use thiserror::Error;

/// Policy engine errors
#[derive(Debug, Error)]
pub enum GuardError {
    /// Operation descriptor does not resolve against the catalog.
    /// Raised while building a registry; the host must not start.
    #[error("Unknown operation: {resource}#{method}")]
    UnknownOperation { resource: String, method: String },

    /// Required configuration is missing, blank or unresolvable at
    /// request/flow-evaluation time
    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    /// Static configuration could not be parsed or is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Identity store or session collaborator failed
    #[error("Store error: {0}")]
    Store(#[from] CoreError),
}

impl GuardError {
    /// Whether the error must stop the host from serving traffic
    pub fn is_fatal(&self) -> bool {
        matches!(self, GuardError::UnknownOperation { .. } | GuardError::InvalidConfig(_))
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::InvalidConfig(err.to_string())
    }
}

/// Result type for policy engine operations
pub type Result<T> = std::result::Result<T, GuardError>;
