//! Collaborator traits implemented by the host

pub mod store;
pub mod session;

// Re-export commonly used traits
pub use store::IdentityStore;
pub use session::{SessionLookup, UserSession};
