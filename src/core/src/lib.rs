//! # Admingate Core
//!
//! Identity-store data model and the collaborator traits a host supplies to
//! the admingate policy engine: realms, clients, users, the composite role
//! graph, and session access for impersonation.

pub mod types;
pub mod traits;
pub mod memory;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{Client, Realm, Role, RoleContainer, RoleGraph, RoleGraphBuilder, RoleId, User};
pub use traits::{IdentityStore, SessionLookup, UserSession};
pub use memory::{InMemoryIdentityStore, InMemorySession, InMemorySessionLookup};

/// Session note written by the host when an administrator impersonates a user
pub const IMPERSONATOR_ID_NOTE: &str = "IMPERSONATOR_ID";

/// Session note recording which impersonator roles justified a grant
pub const IMPERSONATOR_ROLES_NOTE: &str = "IMPERSONATOR_ROLES";

pub type RealmName = String;
pub type UserId = String;
