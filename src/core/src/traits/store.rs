//! Identity store access

use crate::error::Result;
use crate::types::{Client, Realm, RoleGraph, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only view of the host's identity store
///
/// The engine never writes through this trait.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up a client by its public client id
    async fn get_client_by_client_id(&self, realm: &Realm, client_id: &str) -> Result<Option<Client>>;

    /// Look up a user by internal id
    async fn get_user_by_id(&self, realm: &Realm, user_id: &str) -> Result<Option<User>>;

    /// Snapshot of the realm's roles and composite edges
    async fn role_graph(&self, realm: &Realm) -> Result<Arc<RoleGraph>>;
}
