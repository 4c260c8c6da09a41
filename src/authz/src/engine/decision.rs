//! Authorization decision types

use crate::catalog::Operation;
use crate::types::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization decision with the roles that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,

    /// Permit or deny
    pub verdict: Verdict,

    /// Operation the decision is about
    pub operation: Operation,

    /// Subject roles that are also controlling roles, sorted
    pub applicable_roles: Vec<String>,

    /// Applicable roles with a deny entry for the operation, sorted
    pub denying_roles: Vec<String>,

    /// Reason for the decision
    pub reason: DecisionReason,

    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    fn new(
        verdict: Verdict,
        operation: &Operation,
        applicable_roles: Vec<String>,
        denying_roles: Vec<String>,
        reason: DecisionReason,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            verdict,
            operation: operation.clone(),
            applicable_roles,
            denying_roles,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// No controlling role has an entry for the operation
    pub fn ungoverned(operation: &Operation) -> Self {
        Self::new(Verdict::Permit, operation, Vec::new(), Vec::new(), DecisionReason::Ungoverned)
    }

    /// The subject holds none of the controlling roles
    pub fn unrestricted(operation: &Operation) -> Self {
        Self::new(Verdict::Permit, operation, Vec::new(), Vec::new(), DecisionReason::Unrestricted)
    }

    /// Applicable roles exist but none denies the operation
    pub fn not_denied(operation: &Operation, applicable_roles: Vec<String>) -> Self {
        Self::new(
            Verdict::Permit,
            operation,
            applicable_roles,
            Vec::new(),
            DecisionReason::NotDenied,
        )
    }

    /// At least one applicable role denies the operation
    pub fn denied(operation: &Operation, applicable_roles: Vec<String>, denying_roles: Vec<String>) -> Self {
        Self::new(
            Verdict::Deny,
            operation,
            applicable_roles,
            denying_roles.clone(),
            DecisionReason::DeniedBy { roles: denying_roles },
        )
    }

    pub fn is_permit(&self) -> bool {
        self.verdict.is_permit()
    }
}

/// Reason for an authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// Operation not governed by the registry
    Ungoverned,

    /// Subject holds no controlling role
    Unrestricted,

    /// Every applicable controlling role leaves the operation open
    NotDenied,

    /// Deny-overrides: these roles deny the operation
    DeniedBy { roles: Vec<String> },
}
