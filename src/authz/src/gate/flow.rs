//! Authentication-flow adapters over the require-role gate
//!
//! Hosts register these by provider id and hand each invocation the flow
//! step's string configuration map.

use super::RequireRoleGate;
use crate::config::{parse_bool, GateConfig, NEGATE_RESULT};
use crate::error::{GuardError, Result};
use crate::subject::SubjectResolver;
use crate::types::RequestContext;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{error, info};

/// Result of an authenticator step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowChallenge {
    /// Continue the flow
    Success,
    /// The subject lacks the required role
    AccessDenied,
    /// The step is misconfigured or a collaborator failed
    InternalError(String),
}

impl FlowChallenge {
    /// HTTP status of the error page, if the flow fails
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FlowChallenge::Success => None,
            FlowChallenge::AccessDenied => Some(403),
            FlowChallenge::InternalError(_) => Some(500),
        }
    }

    /// Error page message shown to the user
    pub fn message(&self) -> Option<&'static str> {
        match self {
            FlowChallenge::Success => None,
            FlowChallenge::AccessDenied => Some("Access Denied"),
            FlowChallenge::InternalError(_) => Some("Server Misconfiguration"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FlowChallenge::Success)
    }
}

/// Flow step that succeeds or fails the flow
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn provider_id(&self) -> &'static str;

    async fn authenticate(&self, ctx: &RequestContext, config: &HashMap<String, String>) -> FlowChallenge;
}

/// Flow step that selects a conditional branch
#[async_trait]
pub trait ConditionalAuthenticator: Send + Sync {
    fn provider_id(&self) -> &'static str;

    async fn match_condition(&self, ctx: &RequestContext, config: &HashMap<String, String>) -> Result<bool>;
}

/// Fails the flow unless the subject holds the configured role
pub struct RequireRoleAuthenticator {
    gate: RequireRoleGate,
}

impl RequireRoleAuthenticator {
    pub const PROVIDER_ID: &'static str = "require-role";

    pub fn new(gate: RequireRoleGate) -> Self {
        Self { gate }
    }

    pub async fn authenticate_with(&self, ctx: &RequestContext, config: &GateConfig) -> FlowChallenge {
        match self.gate.check(ctx, config).await {
            Ok(true) => {
                info!("access granted");
                FlowChallenge::Success
            }
            Ok(false) => {
                info!("access denied");
                FlowChallenge::AccessDenied
            }
            Err(err) => {
                error!("authenticator misconfigured: {}", err);
                FlowChallenge::InternalError(err.to_string())
            }
        }
    }
}

#[async_trait]
impl Authenticator for RequireRoleAuthenticator {
    fn provider_id(&self) -> &'static str {
        Self::PROVIDER_ID
    }

    async fn authenticate(&self, ctx: &RequestContext, config: &HashMap<String, String>) -> FlowChallenge {
        self.authenticate_with(ctx, &GateConfig::from_map(config)).await
    }
}

/// Branches on whether the subject holds the configured role
pub struct RequireRoleCondition {
    gate: RequireRoleGate,
}

impl RequireRoleCondition {
    pub const PROVIDER_ID: &'static str = "conditional-require-role";

    pub fn new(gate: RequireRoleGate) -> Self {
        Self { gate }
    }

    pub async fn match_with(&self, ctx: &RequestContext, config: &GateConfig) -> Result<bool> {
        match self.gate.check(ctx, config).await {
            Ok(true) => {
                info!("condition met");
                Ok(true)
            }
            Ok(false) => {
                info!("condition not met");
                Ok(false)
            }
            Err(err) => {
                error!("conditional authenticator misconfigured: {}", err);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ConditionalAuthenticator for RequireRoleCondition {
    fn provider_id(&self) -> &'static str {
        Self::PROVIDER_ID
    }

    async fn match_condition(&self, ctx: &RequestContext, config: &HashMap<String, String>) -> Result<bool> {
        self.match_with(ctx, &GateConfig::from_map(config)).await
    }
}

/// Branches on whether the request runs under impersonation
pub struct RequireImpersonationCondition {
    subjects: SubjectResolver,
}

impl RequireImpersonationCondition {
    pub const PROVIDER_ID: &'static str = "conditional-require-impersonation";

    pub fn new(subjects: SubjectResolver) -> Self {
        Self { subjects }
    }

    pub async fn is_impersonating(&self, ctx: &RequestContext, negate: bool) -> Result<bool> {
        let realm = ctx
            .realm
            .as_ref()
            .ok_or_else(|| GuardError::Misconfigured("no realm in context".to_string()))?;

        let active = self
            .subjects
            .impersonation_session(realm, ctx.identity_cookie.as_deref())
            .await?
            .is_some();

        Ok(active != negate)
    }
}

#[async_trait]
impl ConditionalAuthenticator for RequireImpersonationCondition {
    fn provider_id(&self) -> &'static str {
        Self::PROVIDER_ID
    }

    async fn match_condition(&self, ctx: &RequestContext, config: &HashMap<String, String>) -> Result<bool> {
        let negate = parse_bool(config.get(NEGATE_RESULT).map(String::as_str));
        self.is_impersonating(ctx, negate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REQUIRED_ROLE_NAME;
    use admingate_core::{
        InMemoryIdentityStore, InMemorySession, InMemorySessionLookup, Realm, Role, RoleGraph, RoleId, User,
        IMPERSONATOR_ID_NOTE,
    };
    use std::sync::Arc;

    fn subjects() -> SubjectResolver {
        let mut builder = RoleGraph::builder();
        builder.add_role(Role::realm("admin")).unwrap();
        let store = Arc::new(InMemoryIdentityStore::new());
        store.set_role_graph("acme", builder.build().unwrap());

        let sessions = Arc::new(InMemorySessionLookup::new());
        sessions.insert(
            "imp",
            Arc::new(InMemorySession::new("s-1").with_note(IMPERSONATOR_ID_NOTE, "admin-1")),
        );
        SubjectResolver::new(store, sessions)
    }

    fn ctx(user: User) -> RequestContext {
        RequestContext::new().with_realm(Realm::new("acme")).with_user(user)
    }

    fn config(role: &str) -> HashMap<String, String> {
        HashMap::from([(REQUIRED_ROLE_NAME.to_string(), role.to_string())])
    }

    #[test]
    fn test_challenge_mapping() {
        assert_eq!(FlowChallenge::Success.status_code(), None);
        assert_eq!(FlowChallenge::AccessDenied.status_code(), Some(403));
        assert_eq!(FlowChallenge::AccessDenied.message(), Some("Access Denied"));

        let internal = FlowChallenge::InternalError("x".to_string());
        assert_eq!(internal.status_code(), Some(500));
        assert_eq!(internal.message(), Some("Server Misconfiguration"));
    }

    #[tokio::test]
    async fn test_authenticator_outcomes() {
        let authenticator = RequireRoleAuthenticator::new(RequireRoleGate::new(subjects()));
        assert_eq!(authenticator.provider_id(), "require-role");

        let admin = ctx(User::new("u-1", "alice").with_role(RoleId::realm("admin")));
        let plain = ctx(User::new("u-2", "bob"));

        assert!(authenticator.authenticate(&admin, &config("admin")).await.is_success());
        assert_eq!(
            authenticator.authenticate(&plain, &config("admin")).await,
            FlowChallenge::AccessDenied
        );
        assert!(matches!(
            authenticator.authenticate(&plain, &config("  ")).await,
            FlowChallenge::InternalError(_)
        ));
    }

    #[tokio::test]
    async fn test_condition_surfaces_misconfiguration() {
        let condition = RequireRoleCondition::new(RequireRoleGate::new(subjects()));
        let admin = ctx(User::new("u-1", "alice").with_role(RoleId::realm("admin")));

        assert!(condition.match_condition(&admin, &config("admin")).await.unwrap());
        assert!(condition.match_condition(&admin, &config("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_impersonation_condition() {
        let condition = RequireImpersonationCondition::new(subjects());
        let user = User::new("u-1", "alice");
        let impersonated = ctx(user.clone()).with_identity_cookie("imp");
        let plain = ctx(user);

        let negated = HashMap::from([(NEGATE_RESULT.to_string(), "true".to_string())]);
        let empty = HashMap::new();

        assert!(condition.match_condition(&impersonated, &empty).await.unwrap());
        assert!(!condition.match_condition(&impersonated, &negated).await.unwrap());
        assert!(!condition.match_condition(&plain, &empty).await.unwrap());
        assert!(condition.match_condition(&plain, &negated).await.unwrap());
    }
}
