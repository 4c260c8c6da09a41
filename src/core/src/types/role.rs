//! Composite role graph
//!
//! Roles live either in the realm or in a client. A composite role includes
//! other roles; those edges may form cycles, so the graph is stored as a flat
//! arena keyed by [`RoleId`] and never assumed to be a tree.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable role identifier
///
/// Realm and client roles carry distinct prefixes (`realm:<name>` and
/// `client:<client>/<name>`), so a realm role named `a/b` never collides with
/// role `b` of client `a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of a realm-level role
    pub fn realm(name: &str) -> Self {
        Self(format!("realm:{}", name))
    }

    /// Identifier of a role declared by a client
    pub fn client(client_id: &str, name: &str) -> Self {
        Self(format!("client:{}/{}", client_id, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner of a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "client_id", rename_all = "snake_case")]
pub enum RoleContainer {
    Realm,
    Client(String),
}

/// Role definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role identifier
    pub id: RoleId,

    /// Role name, unique within its container
    pub name: String,

    /// Realm or client owning the role
    pub container: RoleContainer,

    /// Roles included by this role (composite edges)
    #[serde(default)]
    pub composites: Vec<RoleId>,
}

impl Role {
    /// Create a realm-level role
    pub fn realm(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: RoleId::realm(&name),
            name,
            container: RoleContainer::Realm,
            composites: Vec::new(),
        }
    }

    /// Create a role declared by a client
    pub fn client(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        let client_id = client_id.into();
        let name = name.into();
        Self {
            id: RoleId::client(&client_id, &name),
            name,
            container: RoleContainer::Client(client_id),
            composites: Vec::new(),
        }
    }

    /// Add a composite edge
    pub fn with_composite(mut self, role: RoleId) -> Self {
        if !self.composites.contains(&role) {
            self.composites.push(role);
        }
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.composites.is_empty()
    }

    /// Client id of the owning client, if any
    pub fn client_id(&self) -> Option<&str> {
        match &self.container {
            RoleContainer::Client(client_id) => Some(client_id),
            RoleContainer::Realm => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidRole(format!(
                "Role '{}' has an empty name",
                self.id
            )));
        }

        if let RoleContainer::Client(client_id) = &self.container {
            if client_id.is_empty() {
                return Err(CoreError::InvalidRole(format!(
                    "Client role '{}' has an empty client id",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Immutable snapshot of a realm's roles and their composite edges
///
/// Lookups are by id, by realm role name, or by (client id, role name).
/// The graph is read-only once built and can be shared across requests
/// behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    /// Arena of role definitions
    roles: HashMap<RoleId, Role>,

    /// Realm role name -> id
    realm_roles: HashMap<String, RoleId>,

    /// Client id -> (role name -> id)
    client_roles: HashMap<String, HashMap<String, RoleId>>,
}

impl RoleGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a graph
    pub fn builder() -> RoleGraphBuilder {
        RoleGraphBuilder::new()
    }

    pub fn get(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(id)
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    /// Look up a realm role by name
    pub fn realm_role(&self, name: &str) -> Option<&Role> {
        self.realm_roles.get(name).and_then(|id| self.roles.get(id))
    }

    /// Look up a client role by client id and role name
    pub fn client_role(&self, client_id: &str, name: &str) -> Option<&Role> {
        self.client_roles
            .get(client_id)
            .and_then(|roles| roles.get(name))
            .and_then(|id| self.roles.get(id))
    }

    /// All roles declared by a client
    pub fn client_roles(&self, client_id: &str) -> impl Iterator<Item = &Role> + '_ {
        self.client_roles
            .get(client_id)
            .into_iter()
            .flat_map(|roles| roles.values())
            .filter_map(|id| self.roles.get(id))
    }

    /// Whether any role is declared by the client
    pub fn has_client(&self, client_id: &str) -> bool {
        self.client_roles.contains_key(client_id)
    }

    /// Direct composite edges of a role (empty for unknown roles)
    pub fn composites(&self, id: &RoleId) -> &[RoleId] {
        self.roles
            .get(id)
            .map(|role| role.composites.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Builder for [`RoleGraph`]
///
/// Unlike a derived-role dependency graph, cycles between composite roles are
/// legal here; the builder only rejects invalid roles, duplicates and edges
/// pointing at roles that were never added.
#[derive(Debug, Clone, Default)]
pub struct RoleGraphBuilder {
    roles: Vec<Role>,
    edges: Vec<(RoleId, RoleId)>,
}

impl RoleGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition
    pub fn add_role(&mut self, role: Role) -> Result<&mut Self> {
        role.validate()?;

        if self.roles.iter().any(|r| r.id == role.id) {
            return Err(CoreError::DuplicateRole(role.id.to_string()));
        }

        self.roles.push(role);
        Ok(self)
    }

    /// Make `parent` a composite that includes `child`
    pub fn add_composite(&mut self, parent: &RoleId, child: &RoleId) -> &mut Self {
        self.edges.push((parent.clone(), child.clone()));
        self
    }

    /// Build the graph, checking that every composite edge resolves
    pub fn build(self) -> Result<RoleGraph> {
        let mut graph = RoleGraph::new();

        for role in self.roles {
            match &role.container {
                RoleContainer::Realm => {
                    graph.realm_roles.insert(role.name.clone(), role.id.clone());
                }
                RoleContainer::Client(client_id) => {
                    graph
                        .client_roles
                        .entry(client_id.clone())
                        .or_default()
                        .insert(role.name.clone(), role.id.clone());
                }
            }
            graph.roles.insert(role.id.clone(), role);
        }

        for (parent, child) in self.edges {
            if !graph.roles.contains_key(&child) {
                return Err(CoreError::InvalidRole(format!(
                    "Composite edge {} -> {} points at an unknown role",
                    parent, child
                )));
            }
            let role = graph.roles.get_mut(&parent).ok_or_else(|| {
                CoreError::InvalidRole(format!(
                    "Composite edge {} -> {} starts at an unknown role",
                    parent, child
                ))
            })?;
            if !role.composites.contains(&child) {
                role.composites.push(child);
            }
        }

        for role in graph.roles.values() {
            if let Some(missing) = role.composites.iter().find(|c| !graph.roles.contains_key(*c)) {
                return Err(CoreError::InvalidRole(format!(
                    "Role '{}' includes unknown role '{}'",
                    role.id, missing
                )));
            }
        }

        Ok(graph)
    }
}
