//! Require-role gate for authentication flows
//!
//! A standalone check, independent of the policy registry: does the
//! effective subject hold a configured role? Flow steps use it either as an
//! authenticator (fail the flow) or as a condition (choose a branch); see
//! [`flow`].
//!
//! Evaluation order:
//!
//! 1. Resolve the role name (`${clientId}` prefix substituted, then
//!    `clientId.role` or realm role). Blank or unknown is misconfiguration.
//! 2. Resolve the subject, optionally the impersonator.
//! 3. Impersonator checks with no active impersonation yield
//!    `!enforce_strictly`.
//! 4. Impersonator checks under impersonation intersect the calling
//!    client's roles that entail the required role with the impersonator's
//!    deep roles.
//! 5. Otherwise direct mappings first, then the transitive closure.
//! 6. `negate` flips the boolean. Errors are never flipped.
//! 7. A granted impersonator check records the intersecting roles on the
//!    session.

pub mod flow;

pub use flow::{
    Authenticator, ConditionalAuthenticator, FlowChallenge, RequireImpersonationCondition,
    RequireRoleAuthenticator, RequireRoleCondition,
};

use crate::config::{GateConfig, CLIENT_ID_PLACEHOLDER};
use crate::engine::MetricsCollector;
use crate::error::{GuardError, Result};
use crate::roles::RoleGraphResolver;
use crate::subject::{Resolution, Subject, SubjectResolver};
use crate::types::RequestContext;
use admingate_core::{IdentityStore, Realm, Role, RoleGraph};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client-prefix splits tried when resolving `clientId.role` names
const MAX_CLIENT_LOOKUPS: usize = 10;

/// Outcome of the role check before negation
struct RoleCheck {
    satisfied: bool,

    /// Calling-client roles through which an impersonator qualified
    granting_roles: Vec<String>,
}

impl From<bool> for RoleCheck {
    fn from(satisfied: bool) -> Self {
        Self {
            satisfied,
            granting_roles: Vec::new(),
        }
    }
}

/// Stateless require-role check shared by all flow steps
#[derive(Clone)]
pub struct RequireRoleGate {
    subjects: SubjectResolver,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RequireRoleGate {
    pub fn new(subjects: SubjectResolver) -> Self {
        Self {
            subjects,
            metrics: None,
        }
    }

    /// Record gate outcomes on a shared collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether the effective subject satisfies `config`
    ///
    /// Returns [`GuardError::Misconfigured`] when the role name is missing,
    /// blank or unresolvable, or the context cannot yield a subject.
    pub async fn check(&self, ctx: &RequestContext, config: &GateConfig) -> Result<bool> {
        let result = self.evaluate(ctx, config).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(satisfied) => metrics.record_gate(*satisfied).await,
                Err(GuardError::Misconfigured(_)) => metrics.record_misconfigured().await,
                Err(_) => metrics.record_error().await,
            }
        }

        result
    }

    async fn evaluate(&self, ctx: &RequestContext, config: &GateConfig) -> Result<bool> {
        let realm = ctx
            .realm
            .as_ref()
            .ok_or_else(|| GuardError::Misconfigured("no realm in context".to_string()))?;

        let store = self.subjects.store();
        let graph = store.role_graph(realm).await?;
        let required = self.resolve_required_role(ctx, realm, &graph, config).await?;

        let subject = match self
            .subjects
            .resolve(ctx, config.apply_to_impersonator.into())
            .await?
        {
            Resolution::Subject(subject) => subject,
            Resolution::NotApplicable(reason) => {
                warn!("require-role gate misconfigured: {}", reason);
                return Err(GuardError::Misconfigured(reason.to_string()));
            }
        };

        info!(
            "checking whether user '{}' has role '{}'",
            subject.user.username, required.name
        );

        let resolver = RoleGraphResolver::new(&graph);
        let check = if config.apply_to_impersonator {
            Self::impersonator_has_role(ctx, &resolver, &subject, &required, config.enforce_strictly)?
        } else {
            RoleCheck::from(resolver.has_role(&subject.user, &required.id))
        };

        let result = check.satisfied != config.negate;
        debug!(
            "role '{}' satisfied={}, negate={} -> {}",
            required.name, check.satisfied, config.negate, result
        );

        // the audit note belongs to the grant path only
        if result {
            if let Some(impersonation) = &subject.impersonation {
                impersonation.record_granting_roles(&check.granting_roles);
            }
        }
        Ok(result)
    }

    fn impersonator_has_role(
        ctx: &RequestContext,
        resolver: &RoleGraphResolver<'_>,
        subject: &Subject,
        required: &Role,
        enforce_strictly: bool,
    ) -> Result<RoleCheck> {
        if subject.impersonation.is_none() {
            debug!("impersonation not active; enforce_strictly={}", enforce_strictly);
            return Ok(RoleCheck::from(!enforce_strictly));
        }

        let client = ctx
            .client
            .as_ref()
            .ok_or_else(|| GuardError::Misconfigured("no client in context".to_string()))?;

        let client_roles = resolver.client_roles_entailing(&client.client_id, &required.id);
        let impersonator_roles = resolver.deep_role_mappings(&subject.user);
        let granting_roles: Vec<String> = client_roles
            .intersection(&impersonator_roles)
            .filter_map(|id| resolver.graph().get(id))
            .map(|role| role.name.clone())
            .collect();

        Ok(RoleCheck {
            satisfied: !granting_roles.is_empty(),
            granting_roles,
        })
    }

    async fn resolve_required_role(
        &self,
        ctx: &RequestContext,
        realm: &Realm,
        graph: &RoleGraph,
        config: &GateConfig,
    ) -> Result<Role> {
        let name = config.role_name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            warn!("require-role gate misconfigured: no role name");
            return Err(GuardError::Misconfigured("required role name is blank".to_string()));
        }

        let name = if name.starts_with(CLIENT_ID_PLACEHOLDER) {
            let client = ctx.client.as_ref().ok_or_else(|| {
                GuardError::Misconfigured(format!("role '{}' needs a client in context", name))
            })?;
            name.replace(CLIENT_ID_PLACEHOLDER, &client.client_id)
        } else {
            name.to_string()
        };

        match role_from_string(self.subjects.store().as_ref(), realm, graph, &name).await? {
            Some(role) => Ok(role),
            None => {
                warn!("require-role gate misconfigured: role '{}' not found", name);
                Err(GuardError::Misconfigured(format!(
                    "role '{}' not found in realm '{}'",
                    name, realm.name
                )))
            }
        }
    }
}

/// Resolve `clientId.roleName` or a realm role name
///
/// Splits are tried from the last '.' leftwards; the first prefix naming an
/// existing client decides, even if that client lacks the role. With no
/// client prefix the whole name is a realm role.
pub async fn role_from_string(
    store: &dyn IdentityStore,
    realm: &Realm,
    graph: &RoleGraph,
    name: &str,
) -> Result<Option<Role>> {
    let mut split = name.rfind('.');
    let mut lookups = 0;

    while let Some(idx) = split {
        if lookups >= MAX_CLIENT_LOOKUPS {
            break;
        }

        let (client_id, role_name) = (&name[..idx], &name[idx + 1..]);
        if store.get_client_by_client_id(realm, client_id).await?.is_some() {
            return Ok(graph.client_role(client_id, role_name).cloned());
        }

        split = name[..idx].rfind('.');
        lookups += 1;
    }

    Ok(graph.realm_role(name).cloned())
}
