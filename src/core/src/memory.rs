//! In-memory identity store and session implementations
//!
//! Reference implementations of the collaborator traits. Hosts embedding the
//! engine normally provide their own; these back the test suites and the
//! `policy-table` tool.

use crate::error::{CoreError, Result};
use crate::traits::{IdentityStore, SessionLookup, UserSession};
use crate::types::{Client, Realm, RoleGraph, User};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct RealmData {
    clients: HashMap<String, Client>,
    users: HashMap<String, User>,
    graph: Arc<RoleGraph>,
}

/// Identity store backed by concurrent maps, one entry per realm
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    realms: DashMap<String, RealmData>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a realm's role graph
    pub fn set_role_graph(&self, realm: &str, graph: RoleGraph) {
        self.realms.entry(realm.to_string()).or_default().graph = Arc::new(graph);
    }

    pub fn add_client(&self, realm: &str, client: Client) {
        self.realms
            .entry(realm.to_string())
            .or_default()
            .clients
            .insert(client.client_id.clone(), client);
    }

    pub fn add_user(&self, realm: &str, user: User) {
        self.realms
            .entry(realm.to_string())
            .or_default()
            .users
            .insert(user.id.clone(), user);
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get_client_by_client_id(&self, realm: &Realm, client_id: &str) -> Result<Option<Client>> {
        Ok(self
            .realms
            .get(&realm.name)
            .and_then(|data| data.clients.get(client_id).cloned()))
    }

    async fn get_user_by_id(&self, realm: &Realm, user_id: &str) -> Result<Option<User>> {
        Ok(self
            .realms
            .get(&realm.name)
            .and_then(|data| data.users.get(user_id).cloned()))
    }

    async fn role_graph(&self, realm: &Realm) -> Result<Arc<RoleGraph>> {
        self.realms
            .get(&realm.name)
            .map(|data| Arc::clone(&data.graph))
            .ok_or_else(|| CoreError::NotFound(format!("realm '{}'", realm.name)))
    }
}

/// Session whose notes live in process memory
#[derive(Debug)]
pub struct InMemorySession {
    id: String,
    notes: RwLock<HashMap<String, String>>,
}

impl InMemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            notes: RwLock::new(HashMap::new()),
        }
    }

    /// Add a note at construction time
    pub fn with_note(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.notes.write().insert(key.into(), value.into());
        self
    }
}

impl UserSession for InMemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn note(&self, key: &str) -> Option<String> {
        self.notes.read().get(key).cloned()
    }

    fn notes(&self) -> HashMap<String, String> {
        self.notes.read().clone()
    }

    fn set_note(&self, key: &str, value: &str) {
        debug!("session {}: note {}={}", self.id, key, value);
        self.notes.write().insert(key.to_string(), value.to_string());
    }
}

/// Cookie -> session table
#[derive(Default)]
pub struct InMemorySessionLookup {
    sessions: DashMap<String, Arc<InMemorySession>>,
}

impl InMemorySessionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identity cookie value to a session
    pub fn insert(&self, identity_cookie: impl Into<String>, session: Arc<InMemorySession>) {
        self.sessions.insert(identity_cookie.into(), session);
    }
}

#[async_trait]
impl SessionLookup for InMemorySessionLookup {
    async fn authenticate_identity_cookie(
        &self,
        _realm: &Realm,
        identity_cookie: Option<&str>,
    ) -> Result<Option<Arc<dyn UserSession>>> {
        let Some(cookie) = identity_cookie else {
            return Ok(None);
        };

        Ok(self
            .sessions
            .get(cookie)
            .map(|session| Arc::clone(session.value()) as Arc<dyn UserSession>))
    }
}
