//! Policy registry: (controlling role, operation) -> deny
//!
//! The registry layers restrictions onto otherwise unrestricted
//! administrative capability. It only ever holds deny entries; an absent
//! entry means the role does not govern that operation. It is built once at
//! startup and never mutated afterwards, so concurrent requests read it
//! without locking.

use crate::catalog::{Operation, OperationCatalog, OperationDescriptor};
use crate::error::{GuardError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

pub mod table;

pub use table::{default_registry, MANAGE_ACCOUNT, MANAGE_CREDENTIALS, MANAGE_PROFILES};

/// Role set for registrations that only pin operations to the catalog
pub const NO_ROLES: [&str; 0] = [];

/// Immutable deny table
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    /// Row per governed operation; column per controlling role; true = denied
    denials: HashMap<Operation, HashMap<String, bool>>,

    /// Every role that appears in at least one register() call
    controlling_roles: BTreeSet<String>,

    /// Catalog the registry was resolved against
    catalog: Arc<OperationCatalog>,
}

impl PolicyRegistry {
    /// Start building a registry against a catalog
    pub fn builder(catalog: Arc<OperationCatalog>) -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::new(catalog)
    }

    /// Whether `role` is explicitly denied `operation`
    pub fn is_denied(&self, role: &str, operation: &Operation) -> bool {
        self.denials
            .get(operation)
            .and_then(|row| row.get(role))
            .copied()
            .unwrap_or(false)
    }

    /// Whether any controlling role has an entry for `operation`
    pub fn governs(&self, operation: &Operation) -> bool {
        self.denials.get(operation).is_some_and(|row| !row.is_empty())
    }

    /// Roles the registry recognises as able to narrow access
    pub fn controlling_roles(&self) -> &BTreeSet<String> {
        &self.controlling_roles
    }

    pub fn is_controlling_role(&self, role: &str) -> bool {
        self.controlling_roles.contains(role)
    }

    /// Map a descriptor to its operation; unknown descriptors are an error
    pub fn resolve_operation(&self, descriptor: &OperationDescriptor) -> Result<Operation> {
        self.catalog.resolve(descriptor)
    }

    /// Map a descriptor to its operation, if the catalog knows it
    pub fn lookup_operation(&self, descriptor: &OperationDescriptor) -> Option<&Operation> {
        self.catalog.lookup(descriptor)
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// Operations denied to `role`, sorted
    pub fn denied_operations(&self, role: &str) -> BTreeSet<&Operation> {
        self.denials
            .iter()
            .filter(|(_, row)| row.get(role).copied().unwrap_or(false))
            .map(|(operation, _)| operation)
            .collect()
    }

    /// Number of (role, operation) deny entries
    pub fn len(&self) -> usize {
        self.denials.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable snapshot of the table
    pub fn snapshot(&self) -> PolicyTable {
        let denials = self
            .controlling_roles
            .iter()
            .map(|role| {
                let operations = self.denied_operations(role).into_iter().cloned().collect();
                (role.clone(), operations)
            })
            .collect();

        PolicyTable {
            catalog_version: self.catalog.version(),
            controlling_roles: self.controlling_roles.iter().cloned().collect(),
            denials,
        }
    }
}

/// Serializable view of a registry
#[derive(Debug, Clone, Serialize)]
pub struct PolicyTable {
    pub catalog_version: u32,
    pub controlling_roles: Vec<String>,
    pub denials: BTreeMap<String, Vec<Operation>>,
}

/// Startup-time builder for [`PolicyRegistry`]
///
/// Construction is all-or-nothing: once any `register` call fails, `build`
/// fails too, even if the caller ignored the first error.
#[derive(Debug)]
pub struct PolicyRegistryBuilder {
    catalog: Arc<OperationCatalog>,
    denials: HashMap<Operation, HashMap<String, bool>>,
    controlling_roles: BTreeSet<String>,
    failure: Option<GuardError>,
}

impl PolicyRegistryBuilder {
    pub fn new(catalog: Arc<OperationCatalog>) -> Self {
        Self {
            catalog,
            denials: HashMap::new(),
            controlling_roles: BTreeSet::new(),
            failure: None,
        }
    }

    /// Deny every operation in `descriptors` to every role in `roles`
    ///
    /// All descriptors are resolved before anything is recorded. An empty
    /// role set records nothing but still checks that the descriptors exist.
    pub fn register<'a, R, D>(&mut self, roles: R, descriptors: D) -> Result<&mut Self>
    where
        R: IntoIterator<Item = &'a str>,
        D: IntoIterator<Item = &'a OperationDescriptor>,
    {
        if let Some(failure) = &self.failure {
            return Err(Self::replay(failure));
        }

        let roles: Vec<&str> = roles.into_iter().collect();
        if let Some(blank) = roles.iter().find(|role| role.trim().is_empty()) {
            let err = GuardError::InvalidConfig(format!("controlling role name '{}' is blank", blank));
            self.failure = Some(Self::replay(&err));
            return Err(err);
        }

        let mut operations = Vec::new();
        for descriptor in descriptors {
            match self.catalog.resolve(descriptor) {
                Ok(operation) => operations.push(operation),
                Err(err) => {
                    self.failure = Some(Self::replay(&err));
                    return Err(err);
                }
            }
        }

        for role in &roles {
            self.controlling_roles.insert(role.to_string());
            for operation in &operations {
                debug!("deny {} -> {}", role, operation);
                self.denials
                    .entry(operation.clone())
                    .or_default()
                    .insert(role.to_string(), true);
            }
        }

        Ok(self)
    }

    /// Finish construction
    pub fn build(self) -> Result<PolicyRegistry> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }

        let registry = PolicyRegistry {
            denials: self.denials,
            controlling_roles: self.controlling_roles,
            catalog: self.catalog,
        };

        info!(
            "PolicyRegistry built: {} controlling roles, {} deny entries",
            registry.controlling_roles.len(),
            registry.len()
        );

        Ok(registry)
    }

    fn replay(err: &GuardError) -> GuardError {
        match err {
            GuardError::UnknownOperation { resource, method } => GuardError::UnknownOperation {
                resource: resource.clone(),
                method: method.clone(),
            },
            GuardError::InvalidConfig(msg) => GuardError::InvalidConfig(msg.clone()),
            other => GuardError::InvalidConfig(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<OperationCatalog> {
        Arc::new(OperationCatalog::admin_console())
    }

    fn op(resource: &str, method: &str) -> OperationDescriptor {
        OperationDescriptor::new(resource, method)
    }

    #[test]
    fn test_cartesian_product() {
        let mut builder = PolicyRegistry::builder(catalog());
        builder
            .register(
                ["manage-profiles", "manage-credentials"],
                &[op("UserResource", "joinGroup"), op("UserResource", "logout")],
            )
            .unwrap();
        let registry = builder.build().unwrap();

        assert_eq!(registry.len(), 4);
        let join = Operation::new("admin.user", "join_group");
        let logout = Operation::new("admin.user", "logout");
        assert!(registry.is_denied("manage-profiles", &join));
        assert!(registry.is_denied("manage-credentials", &logout));
        assert!(!registry.is_denied("manage-account", &join));
    }

    #[test]
    fn test_absent_entry_permits() {
        let registry = PolicyRegistry::builder(catalog()).build().unwrap();
        let op = Operation::new("admin.user", "delete_user");

        assert!(!registry.is_denied("manage-credentials", &op));
        assert!(!registry.governs(&op));
        assert!(registry.controlling_roles().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut builder = PolicyRegistry::builder(catalog());
        let ops = [op("UserResource", "deleteUser")];
        builder.register(["manage-credentials"], &ops).unwrap();
        builder.register(["manage-credentials"], &ops).unwrap();
        let registry = builder.build().unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.is_denied("manage-credentials", &Operation::new("admin.user", "delete_user")));
    }

    #[test]
    fn test_unknown_operation_fails_build() {
        let mut builder = PolicyRegistry::builder(catalog());
        builder.register(["manage-credentials"], &[op("UserResource", "deleteUser")]).unwrap();

        let err = builder
            .register(["manage-credentials"], &[op("UserResource", "renamedMethod")])
            .unwrap_err();
        assert!(matches!(err, GuardError::UnknownOperation { .. }));
        assert!(err.is_fatal());

        // Later registrations and the final build keep failing
        assert!(builder.register(["manage-profiles"], &[op("UserResource", "logout")]).is_err());
        assert!(matches!(builder.build(), Err(GuardError::UnknownOperation { .. })));
    }

    #[test]
    fn test_failed_register_records_nothing() {
        let mut builder = PolicyRegistry::builder(catalog());
        let _ = builder.register(
            ["manage-credentials"],
            &[op("UserResource", "deleteUser"), op("UserResource", "nope")],
        );
        assert!(builder.denials.is_empty());
        assert!(builder.controlling_roles.is_empty());
    }

    #[test]
    fn test_empty_role_set_still_validates() {
        let mut builder = PolicyRegistry::builder(catalog());
        builder.register(NO_ROLES, &[op("UserResource", "getUser")]).unwrap();
        assert!(builder.register(NO_ROLES, &[op("UserResource", "getUserz")]).is_err());

        let mut builder = PolicyRegistry::builder(catalog());
        builder.register(NO_ROLES, &[op("UserResource", "getUser")]).unwrap();
        let registry = builder.build().unwrap();
        assert!(!registry.governs(&Operation::new("admin.user", "get_user")));
    }

    #[test]
    fn test_blank_role_rejected() {
        let mut builder = PolicyRegistry::builder(catalog());
        let result = builder.register([" "], &[op("UserResource", "getUser")]);
        assert!(matches!(result, Err(GuardError::InvalidConfig(_))));
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_resolve_operation_through_registry() {
        let registry = PolicyRegistry::builder(catalog()).build().unwrap();
        assert!(registry.resolve_operation(&op("UserResource", "deleteUser")).is_ok());
        assert!(registry.resolve_operation(&op("UserResource", "x")).is_err());
        assert!(registry.lookup_operation(&op("UserResource", "x")).is_none());
    }

    #[test]
    fn test_snapshot() {
        let mut builder = PolicyRegistry::builder(catalog());
        builder
            .register(["manage-credentials"], &[op("UsersResource", "createUser")])
            .unwrap();
        let table = builder.build().unwrap().snapshot();

        assert_eq!(table.controlling_roles, vec!["manage-credentials".to_string()]);
        assert_eq!(
            table.denials["manage-credentials"],
            vec![Operation::new("admin.users", "create_user")]
        );

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["catalog_version"], 1);
    }
}
