//! Request filter for the restricted admin and account consoles

use super::metrics::MetricsCollector;
use super::{Authorizer, Decision};
use crate::config::{EngineConfig, NotApplicableAction};
use crate::error::Result;
use crate::policy::PolicyRegistry;
use crate::roles::RoleGraphResolver;
use crate::subject::{NotApplicable, Resolution, SubjectResolver};
use crate::types::RequestContext;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the host should do with the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Let the request proceed
    Continue,
    /// Abort the request with 403
    Forbidden,
}

impl FilterOutcome {
    pub fn is_continue(self) -> bool {
        matches!(self, FilterOutcome::Continue)
    }

    /// HTTP status to abort with, if any
    pub fn status_code(self) -> Option<u16> {
        match self {
            FilterOutcome::Continue => None,
            FilterOutcome::Forbidden => Some(403),
        }
    }
}

/// Registry-driven filter in front of the console APIs
///
/// Holds only shared read-only state; every request's data comes in
/// through [`RequestContext`].
pub struct AdminResourceFilter {
    authorizer: Authorizer,
    subjects: SubjectResolver,
    config: EngineConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl AdminResourceFilter {
    pub fn new(registry: Arc<PolicyRegistry>, subjects: SubjectResolver, config: EngineConfig) -> Self {
        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "AdminResourceFilter initialized with not_applicable={:?}, apply_to_impersonator={}, metrics={}",
            config.not_applicable, config.apply_to_impersonator, config.enable_metrics
        );

        Self {
            authorizer: Authorizer::new(registry),
            subjects,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsCollector>> {
        self.metrics.as_ref()
    }

    /// Evaluate one request
    pub async fn filter(&self, ctx: &RequestContext) -> Result<FilterOutcome> {
        let start = Instant::now();
        let result = self.evaluate(ctx).await;

        if let Some(metrics) = &self.metrics {
            if result.is_err() {
                metrics.record_error().await;
            }
            metrics.record_latency(start.elapsed()).await;
        }

        result
    }

    async fn evaluate(&self, ctx: &RequestContext) -> Result<FilterOutcome> {
        let registry = self.authorizer.registry();

        let Some(operation) = ctx
            .operation
            .as_ref()
            .and_then(|descriptor| registry.lookup_operation(descriptor))
        else {
            debug!("Request operation is not catalogued; continuing");
            self.record_ungoverned().await;
            return Ok(FilterOutcome::Continue);
        };

        if !registry.governs(operation) {
            debug!("{} is not governed; continuing", operation);
            self.record_ungoverned().await;
            return Ok(FilterOutcome::Continue);
        }

        let Some(realm) = ctx.realm.as_ref() else {
            return Ok(self.not_applicable(&NotApplicable::MissingRealm).await);
        };
        let Some(client) = ctx.client.as_ref() else {
            return Ok(self.not_applicable(&NotApplicable::MissingClient).await);
        };

        let Some(role_client_id) = self.config.role_client_for(realm, &client.client_id) else {
            debug!(
                "Client {} is not a restricted console in realm {}; continuing",
                client.client_id, realm.name
            );
            return Ok(FilterOutcome::Continue);
        };

        let store = self.subjects.store();
        if store.get_client_by_client_id(realm, role_client_id).await?.is_none() {
            debug!("Role client {} not found in realm {}; continuing", role_client_id, realm.name);
            return Ok(FilterOutcome::Continue);
        }

        let subject = match self
            .subjects
            .resolve(ctx, self.config.apply_to_impersonator.into())
            .await?
        {
            Resolution::Subject(subject) => subject,
            Resolution::NotApplicable(reason) => return Ok(self.not_applicable(&reason).await),
        };

        let graph = store.role_graph(realm).await?;
        let roles = RoleGraphResolver::new(&graph).direct_client_role_names(&subject.user, role_client_id);

        let decision: Decision = self
            .authorizer
            .authorize(roles.iter().map(String::as_str), operation);

        if let Some(metrics) = &self.metrics {
            metrics.record_verdict(decision.is_permit()).await;
        }

        if !decision.is_permit() {
            info!(
                "Denied {} to {} (roles: {:?})",
                operation, subject.user.username, decision.denying_roles
            );
            return Ok(FilterOutcome::Forbidden);
        }

        if let Some(impersonation) = &subject.impersonation {
            impersonation.record_granting_roles(&decision.applicable_roles);
        }

        debug!("Permitted {} to {}", operation, subject.user.username);
        Ok(FilterOutcome::Continue)
    }

    async fn not_applicable(&self, reason: &NotApplicable) -> FilterOutcome {
        if let Some(metrics) = &self.metrics {
            metrics.record_not_applicable().await;
        }

        if let NotApplicable::ImpersonatorNotFound(_) = reason {
            // a dangling impersonation must not lift the nominal user's restrictions
            warn!("Filter not applicable ({}); denying", reason);
            return FilterOutcome::Forbidden;
        }

        match self.config.not_applicable {
            NotApplicableAction::Skip => {
                warn!("Filter not applicable ({}); skipping enforcement", reason);
                FilterOutcome::Continue
            }
            NotApplicableAction::Deny => {
                warn!("Filter not applicable ({}); denying", reason);
                FilterOutcome::Forbidden
            }
        }
    }

    async fn record_ungoverned(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_ungoverned().await;
        }
    }
}
