//! Identity-store types consumed by the policy engine

pub mod role;
pub mod realm;

// Re-export commonly used types
pub use role::{Role, RoleContainer, RoleGraph, RoleGraphBuilder, RoleId};
pub use realm::{Client, Realm, User};
