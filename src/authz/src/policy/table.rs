//! Built-in restricted-administration policy table
//!
//! Three controlling roles narrow what an administrator (or account owner)
//! may do from the consoles:
//!
//! - `manage-profiles` (realm-management client): may manage other users'
//!   profiles and credentials only.
//! - `manage-credentials` (realm-management client): may manage other users'
//!   credentials only.
//! - `manage-account` (account client): may manage their own password only.
//!
//! Groups registered with no roles are read-only views that stay open to
//! everyone; they are listed so a renamed operation still fails startup.

use super::{PolicyRegistry, NO_ROLES};
use crate::catalog::{OperationCatalog, OperationDescriptor};
use crate::error::Result;
use std::sync::Arc;

pub const MANAGE_PROFILES: &str = "manage-profiles";

pub const MANAGE_CREDENTIALS: &str = "manage-credentials";

pub const MANAGE_ACCOUNT: &str = "manage-account";

fn ops(resource: &str, methods: &[&str]) -> Vec<OperationDescriptor> {
    methods
        .iter()
        .map(|method| OperationDescriptor::new(resource, *method))
        .collect()
}

/// Build the restricted-administration registry over the admin console catalog
pub fn default_registry() -> Result<PolicyRegistry> {
    let mut builder = PolicyRegistry::builder(Arc::new(OperationCatalog::admin_console()));

    // account console
    let account_views = ops("AccountRestService", &["account", "credentials"]);
    builder.register(NO_ROLES, &account_views)?;

    let mut account_restricted = ops(
        "AccountRestService",
        &[
            "updateAccount",
            "applications",
            "getConsent",
            "grantConsent",
            "revokeConsent",
            "updateConsent",
            "groupMemberships",
            "linkedAccounts",
            "organizations",
            "resources",
            "sessions",
        ],
    );
    account_restricted.extend(ops("SessionResource", &["devices"]));
    builder.register([MANAGE_ACCOUNT], &account_restricted)?;

    // users
    let mut user_views = ops("UsersResource", &["getUsers"]);
    user_views.extend(ops("UserResource", &["getUser"]));
    builder.register(NO_ROLES, &user_views)?;

    let mut user_changes = ops("UsersResource", &["createUser"]);
    user_changes.extend(ops("UserResource", &["deleteUser", "updateUser"]));
    builder.register([MANAGE_CREDENTIALS], &user_changes)?;

    // credentials
    let credentials = ops(
        "UserResource",
        &["credentials", "resetPassword", "removeCredential", "setCredentialUserLabel"],
    );
    builder.register(NO_ROLES, &credentials)?;

    let both = [MANAGE_PROFILES, MANAGE_CREDENTIALS];

    // role mappings
    let mut role_mappings = ops(
        "RoleMapperResource",
        &["getRoleMappings", "addRealmRoleMappings", "deleteRealmRoleMappings"],
    );
    role_mappings.extend(ops(
        "ClientRoleMappingsResource",
        &["addClientRoleMapping", "deleteClientRoleMapping"],
    ));
    builder.register(both, &role_mappings)?;

    // group memberships
    let groups = ops("UserResource", &["groupMembership", "joinGroup", "removeMembership"]);
    builder.register(both, &groups)?;

    // consents
    let consents = ops("UserResource", &["getConsents", "revokeConsent"]);
    builder.register(both, &consents)?;

    // federated identities
    let federated = ops(
        "UserResource",
        &[
            "getFederatedIdentities",
            "getFederatedIdentity",
            "addFederatedIdentity",
            "removeFederatedIdentity",
        ],
    );
    builder.register(both, &federated)?;

    // sessions
    let mut sessions = ops("UserResource", &["getSessions", "getOfflineSessions", "logout"]);
    sessions.extend(ops("RealmAdminResource", &["deleteSession"]));
    builder.register(both, &sessions)?;

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Operation;

    #[test]
    fn test_default_registry_builds() {
        let registry = default_registry().unwrap();

        let roles: Vec<&str> = registry.controlling_roles().iter().map(String::as_str).collect();
        assert_eq!(roles, vec![MANAGE_ACCOUNT, MANAGE_CREDENTIALS, MANAGE_PROFILES]);
    }

    #[test]
    fn test_credentials_role_cannot_change_users() {
        let registry = default_registry().unwrap();
        let delete = Operation::new("admin.user", "delete_user");

        assert!(registry.is_denied(MANAGE_CREDENTIALS, &delete));
        assert!(!registry.is_denied(MANAGE_PROFILES, &delete));
        assert!(registry.governs(&delete));
    }

    #[test]
    fn test_views_are_not_governed() {
        let registry = default_registry().unwrap();

        for view in [
            Operation::new("admin.users", "get_users"),
            Operation::new("admin.user", "get_user"),
            Operation::new("admin.user", "reset_password"),
            Operation::new("account", "credentials"),
        ] {
            assert!(!registry.governs(&view), "{} should not be governed", view);
        }
    }

    #[test]
    fn test_account_console_restrictions() {
        let registry = default_registry().unwrap();
        let denied = registry.denied_operations(MANAGE_ACCOUNT);

        assert_eq!(denied.len(), 12);
        assert!(denied.contains(&Operation::new("account.sessions", "devices")));
        assert!(!denied.contains(&Operation::new("account", "credentials")));
    }

    #[test]
    fn test_both_admin_roles_share_restrictions() {
        let registry = default_registry().unwrap();
        let logout = Operation::new("admin.user", "logout");
        let delete_session = Operation::new("admin.realm", "delete_session");

        for role in [MANAGE_PROFILES, MANAGE_CREDENTIALS] {
            assert!(registry.is_denied(role, &logout));
            assert!(registry.is_denied(role, &delete_session));
        }
        assert!(!registry.is_denied(MANAGE_ACCOUNT, &logout));
    }
}
