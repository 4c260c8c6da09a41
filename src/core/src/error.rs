//! Error types shared by the identity-store model and its collaborators

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for identity-store lookups and role graph construction
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity not found in the identity store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing identity store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Session lookup or note write failed
    #[error("Session error: {0}")]
    Session(String),

    /// Role definition is invalid (empty name, dangling composite edge)
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Role registered twice in the same graph
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),
}
