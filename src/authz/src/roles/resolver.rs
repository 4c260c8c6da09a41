//! Cycle-safe traversal of the composite role graph

use admingate_core::{Role, RoleGraph, RoleId, User};
use std::collections::{BTreeSet, HashSet};

/// Read-only view over a realm's role graph
///
/// Borrowing the graph keeps the resolver free to construct per request;
/// the graph itself is shared behind an `Arc` by the identity store.
#[derive(Debug, Clone, Copy)]
pub struct RoleGraphResolver<'g> {
    graph: &'g RoleGraph,
}

impl<'g> RoleGraphResolver<'g> {
    pub fn new(graph: &'g RoleGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g RoleGraph {
        self.graph
    }

    /// Whether holding `role` grants `target`
    ///
    /// A role entails itself. The walk stops as soon as `target` is found
    /// and never visits a role twice, so cycles terminate.
    pub fn entails(&self, role: &RoleId, target: &RoleId) -> bool {
        if role == target {
            return true;
        }

        let mut visited: HashSet<&RoleId> = HashSet::new();
        let mut stack: Vec<&RoleId> = vec![role];
        visited.insert(role);

        while let Some(current) = stack.pop() {
            for child in self.graph.composites(current) {
                if child == target {
                    return true;
                }
                if visited.insert(child) {
                    stack.push(child);
                }
            }
        }

        false
    }

    /// Every role granted by `role`, including `role` itself
    pub fn flatten(&self, role: &RoleId) -> BTreeSet<RoleId> {
        let mut visited: BTreeSet<RoleId> = BTreeSet::new();
        let mut stack: Vec<&RoleId> = vec![role];
        visited.insert(role.clone());

        while let Some(current) = stack.pop() {
            for child in self.graph.composites(current) {
                if visited.insert(child.clone()) {
                    stack.push(child);
                }
            }
        }

        visited
    }

    /// Union of the flattenings of every role mapped directly to `user`
    pub fn deep_role_mappings(&self, user: &User) -> BTreeSet<RoleId> {
        let mut roles = BTreeSet::new();
        for mapped in &user.role_mappings {
            if roles.contains(mapped) {
                continue;
            }
            roles.extend(self.flatten(mapped));
        }
        roles
    }

    /// Whether `user` holds `target` directly or through a composite
    ///
    /// The direct mapping check runs first; the graph is only walked when it
    /// misses.
    pub fn has_role(&self, user: &User, target: &RoleId) -> bool {
        if user.has_direct_role(target) {
            return true;
        }

        user.role_mappings
            .iter()
            .any(|mapped| self.entails(mapped, target))
    }

    /// Roles of `client_id` whose flattening contains `target`
    pub fn client_roles_entailing(&self, client_id: &str, target: &RoleId) -> BTreeSet<RoleId> {
        self.graph
            .client_roles(client_id)
            .filter(|role| self.entails(&role.id, target))
            .map(|role| role.id.clone())
            .collect()
    }

    /// Names of the roles of `client_id` mapped directly to `user`
    pub fn direct_client_role_names(&self, user: &User, client_id: &str) -> BTreeSet<String> {
        user.role_mappings
            .iter()
            .filter_map(|id| self.graph.get(id))
            .filter(|role| role.client_id() == Some(client_id))
            .map(|role: &Role| role.name.clone())
            .collect()
    }
}
