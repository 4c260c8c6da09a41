//! Catalog of protected operations
//!
//! The host framework identifies an incoming call by a descriptor (resource
//! type and method as its own introspection reports them). The catalog maps
//! each descriptor to a stable [`Operation`] so the policy table does not
//! depend on the framework's internal naming. A descriptor the catalog does
//! not know is an [`GuardError::UnknownOperation`].

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Version of the built-in admin console catalog
pub const ADMIN_CONSOLE_CATALOG_VERSION: u32 = 1;

/// Stable identity of a protected operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Operation {
    /// Resource group (e.g., "admin.user")
    pub resource_group: String,

    /// Action within the group (e.g., "delete_user")
    pub action: String,
}

impl Operation {
    pub fn new(resource_group: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_group, self.action)
    }
}

/// Operation as the host framework names it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Resource type name
    pub resource: String,

    /// Method name on the resource type
    pub method: String,
}

impl OperationDescriptor {
    pub fn new(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.method)
    }
}

/// One row of a generated descriptor mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub resource: String,
    pub method: String,
    pub resource_group: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: u32,
    entries: Vec<CatalogEntry>,
}

/// Immutable descriptor -> operation table
#[derive(Debug, Clone)]
pub struct OperationCatalog {
    version: u32,
    by_descriptor: HashMap<OperationDescriptor, Operation>,
}

impl OperationCatalog {
    /// Create an empty catalog
    pub fn new(version: u32) -> Self {
        Self {
            version,
            by_descriptor: HashMap::new(),
        }
    }

    /// Build a catalog from generated entries
    ///
    /// Two descriptors may share an operation; one descriptor mapped to two
    /// different operations is ambiguous and rejected.
    pub fn from_entries(version: u32, entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Self> {
        let mut catalog = Self::new(version);
        for entry in entries {
            let descriptor = OperationDescriptor::new(entry.resource, entry.method);
            let operation = Operation::new(entry.resource_group, entry.action);
            catalog.insert(descriptor, operation)?;
        }
        Ok(catalog)
    }

    /// Parse a catalog document: `{"version": 1, "entries": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_entries(document.version, document.entries)
    }

    fn insert(&mut self, descriptor: OperationDescriptor, operation: Operation) -> Result<()> {
        if descriptor.resource.is_empty() || descriptor.method.is_empty() {
            return Err(GuardError::InvalidConfig(format!(
                "catalog descriptor '{}' is incomplete",
                descriptor
            )));
        }
        if operation.resource_group.is_empty() || operation.action.is_empty() {
            return Err(GuardError::InvalidConfig(format!(
                "catalog operation for '{}' is incomplete",
                descriptor
            )));
        }

        match self.by_descriptor.get(&descriptor) {
            Some(existing) if existing != &operation => Err(GuardError::InvalidConfig(format!(
                "descriptor '{}' maps to both '{}' and '{}'",
                descriptor, existing, operation
            ))),
            _ => {
                self.by_descriptor.insert(descriptor, operation);
                Ok(())
            }
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Resolve a descriptor, failing if the catalog does not know it
    pub fn resolve(&self, descriptor: &OperationDescriptor) -> Result<Operation> {
        self.lookup(descriptor)
            .cloned()
            .ok_or_else(|| GuardError::UnknownOperation {
                resource: descriptor.resource.clone(),
                method: descriptor.method.clone(),
            })
    }

    /// Resolve a descriptor without treating a miss as an error
    pub fn lookup(&self, descriptor: &OperationDescriptor) -> Option<&Operation> {
        self.by_descriptor.get(descriptor)
    }

    /// All distinct operations in the catalog
    pub fn operations(&self) -> BTreeSet<&Operation> {
        self.by_descriptor.values().collect()
    }

    pub fn len(&self) -> usize {
        self.by_descriptor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_descriptor.is_empty()
    }

    /// Operations exposed by the account console and the security-admin
    /// console
    pub fn admin_console() -> Self {
        const ENTRIES: &[(&str, &str, &str, &str)] = &[
            // account console
            ("AccountRestService", "account", "account", "account"),
            ("AccountRestService", "updateAccount", "account", "update_account"),
            ("AccountRestService", "applications", "account", "applications"),
            ("AccountRestService", "getConsent", "account", "get_consent"),
            ("AccountRestService", "grantConsent", "account", "grant_consent"),
            ("AccountRestService", "revokeConsent", "account", "revoke_consent"),
            ("AccountRestService", "updateConsent", "account", "update_consent"),
            ("AccountRestService", "credentials", "account", "credentials"),
            ("AccountRestService", "groupMemberships", "account", "group_memberships"),
            ("AccountRestService", "linkedAccounts", "account", "linked_accounts"),
            ("AccountRestService", "organizations", "account", "organizations"),
            ("AccountRestService", "resources", "account", "resources"),
            ("AccountRestService", "sessions", "account", "sessions"),
            ("SessionResource", "devices", "account.sessions", "devices"),
            // security-admin console: users
            ("UsersResource", "getUsers", "admin.users", "get_users"),
            ("UsersResource", "createUser", "admin.users", "create_user"),
            ("UserResource", "getUser", "admin.user", "get_user"),
            ("UserResource", "deleteUser", "admin.user", "delete_user"),
            ("UserResource", "updateUser", "admin.user", "update_user"),
            // credentials
            ("UserResource", "credentials", "admin.user", "credentials"),
            ("UserResource", "resetPassword", "admin.user", "reset_password"),
            ("UserResource", "removeCredential", "admin.user", "remove_credential"),
            ("UserResource", "setCredentialUserLabel", "admin.user", "set_credential_user_label"),
            // role mappings
            ("RoleMapperResource", "getRoleMappings", "admin.role-mapper", "get_role_mappings"),
            ("RoleMapperResource", "addRealmRoleMappings", "admin.role-mapper", "add_realm_role_mappings"),
            ("RoleMapperResource", "deleteRealmRoleMappings", "admin.role-mapper", "delete_realm_role_mappings"),
            ("ClientRoleMappingsResource", "addClientRoleMapping", "admin.client-role-mappings", "add_client_role_mapping"),
            ("ClientRoleMappingsResource", "deleteClientRoleMapping", "admin.client-role-mappings", "delete_client_role_mapping"),
            // group memberships
            ("UserResource", "groupMembership", "admin.user", "group_membership"),
            ("UserResource", "joinGroup", "admin.user", "join_group"),
            ("UserResource", "removeMembership", "admin.user", "remove_membership"),
            // consents
            ("UserResource", "getConsents", "admin.user", "get_consents"),
            ("UserResource", "revokeConsent", "admin.user", "revoke_consent"),
            // federated identities
            ("UserResource", "getFederatedIdentities", "admin.user", "get_federated_identities"),
            ("UserResource", "getFederatedIdentity", "admin.user", "get_federated_identity"),
            ("UserResource", "addFederatedIdentity", "admin.user", "add_federated_identity"),
            ("UserResource", "removeFederatedIdentity", "admin.user", "remove_federated_identity"),
            // sessions
            ("UserResource", "getSessions", "admin.user", "get_sessions"),
            ("UserResource", "getOfflineSessions", "admin.user", "get_offline_sessions"),
            ("UserResource", "logout", "admin.user", "logout"),
            ("RealmAdminResource", "deleteSession", "admin.realm", "delete_session"),
        ];

        let mut catalog = Self::new(ADMIN_CONSOLE_CATALOG_VERSION);
        for (resource, method, group, action) in ENTRIES {
            catalog.by_descriptor.insert(
                OperationDescriptor::new(*resource, *method),
                Operation::new(*group, *action),
            );
        }
        catalog
    }
}
