//! Decision engine
//!
//! The [`Authorizer`] is the pure decision algorithm over a
//! [`PolicyRegistry`]; the [`AdminResourceFilter`] wires it to subject
//! resolution, console bindings and metrics for the request path.

pub mod decision;
pub mod filter;
pub mod metrics;

pub use decision::{Decision, DecisionReason};
pub use filter::{AdminResourceFilter, FilterOutcome};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::catalog::Operation;
use crate::policy::PolicyRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Deny-overrides evaluation of a subject's controlling roles
///
/// ```text
/// operation governed? ──no──> Permit (Ungoverned)
///        │yes
/// roles ∩ controlling = ∅ ──> Permit (Unrestricted)
///        │
/// any role denies? ──yes──> Deny (DeniedBy)
///        │no
///      Permit (NotDenied)
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    registry: Arc<PolicyRegistry>,
}

impl Authorizer {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Decide `operation` for a subject holding `roles` (direct mappings only)
    pub fn authorize<'a, I>(&self, roles: I, operation: &Operation) -> Decision
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.registry.governs(operation) {
            debug!("{} is not governed; permitting", operation);
            return Decision::ungoverned(operation);
        }

        let applicable: BTreeSet<&str> = roles
            .into_iter()
            .filter(|role| self.registry.is_controlling_role(role))
            .collect();

        if applicable.is_empty() {
            debug!("No controlling role held for {}; permitting", operation);
            return Decision::unrestricted(operation);
        }

        let denying: Vec<String> = applicable
            .iter()
            .filter(|role| self.registry.is_denied(role, operation))
            .map(|role| role.to_string())
            .collect();
        let applicable: Vec<String> = applicable.into_iter().map(str::to_string).collect();

        debug!(
            "{}: applicable roles {:?}, denying roles {:?}",
            operation, applicable, denying
        );

        if denying.is_empty() {
            Decision::not_denied(operation, applicable)
        } else {
            Decision::denied(operation, applicable, denying)
        }
    }
}
