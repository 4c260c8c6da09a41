//! Realm, client and user types

use super::role::RoleId;
use serde::{Deserialize, Serialize};

/// Tenant in which users, clients and roles live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    /// Realm name
    pub name: String,

    /// Theme applied to the account console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_theme: Option<String>,

    /// Theme applied to the security-admin console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_theme: Option<String>,
}

impl Realm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_theme: None,
            admin_theme: None,
        }
    }

    pub fn with_account_theme(mut self, theme: impl Into<String>) -> Self {
        self.account_theme = Some(theme.into());
        self
    }

    pub fn with_admin_theme(mut self, theme: impl Into<String>) -> Self {
        self.admin_theme = Some(theme.into());
        self
    }
}

/// Client registered in a realm (console application, role container, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Client {
    /// Internal identifier
    pub id: String,

    /// Public client identifier (e.g., "realm-management", "account-console")
    pub client_id: String,
}

impl Client {
    /// Create a client whose internal id mirrors its client id
    pub fn new(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self {
            id: client_id.clone(),
            client_id,
        }
    }
}

/// User account with its direct role mappings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier (referenced by the impersonation session note)
    pub id: String,

    /// Login name
    pub username: String,

    /// Roles assigned directly to the user; composites are not expanded
    #[serde(default)]
    pub role_mappings: Vec<RoleId>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role_mappings: Vec::new(),
        }
    }

    /// Assign a role directly to the user
    pub fn with_role(mut self, role: RoleId) -> Self {
        if !self.role_mappings.contains(&role) {
            self.role_mappings.push(role);
        }
        self
    }

    /// Check a direct role mapping without walking composites
    pub fn has_direct_role(&self, role: &RoleId) -> bool {
        self.role_mappings.contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_assignment_is_idempotent() {
        let role = RoleId::realm("auditor");
        let user = User::new("u-1", "alice")
            .with_role(role.clone())
            .with_role(role.clone());

        assert_eq!(user.role_mappings.len(), 1);
        assert!(user.has_direct_role(&role));
        assert!(!user.has_direct_role(&RoleId::realm("admin")));
    }

    #[test]
    fn test_realm_themes() {
        let realm = Realm::new("acme").with_admin_theme("restricted");
        assert_eq!(realm.admin_theme.as_deref(), Some("restricted"));
        assert!(realm.account_theme.is_none());
    }
}
