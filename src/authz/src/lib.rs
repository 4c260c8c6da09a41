//! # Admingate Authorization Engine
//!
//! Resource access policy engine for an identity provider's admin API.
//!
//! ## Features
//!
//! - **Static deny table** of (controlling role, operation) pairs, validated
//!   against a versioned operation catalog at startup
//! - **Deny-overrides** evaluation with default-allow for unrestricted subjects
//! - **Cycle-safe composite role resolution** over the realm's role graph
//! - **Impersonation-aware subjects** with an audit note on granting roles
//! - **Require-role gate** and flow adapters for authentication flows
//!
//! ## Example
//!
//! ```rust
//! use admingate_authz::{default_registry, Authorizer, Operation, Verdict};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authorizer = Authorizer::new(Arc::new(default_registry()?));
//!     let delete_user = Operation::new("admin.user", "delete_user");
//!
//!     let decision = authorizer.authorize(["manage-credentials"], &delete_user);
//!     assert_eq!(decision.verdict, Verdict::Deny);
//!
//!     let decision = authorizer.authorize(["manage-profiles"], &delete_user);
//!     assert_eq!(decision.verdict, Verdict::Permit);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod policy;
pub mod roles;
pub mod subject;
pub mod types;

// Re-export commonly used types
pub use catalog::{Operation, OperationCatalog, OperationDescriptor};
pub use config::{EngineConfig, GateConfig, NotApplicableAction};
pub use engine::{AdminResourceFilter, Authorizer, Decision, DecisionReason, FilterOutcome, MetricsCollector};
pub use error::{GuardError, Result};
pub use gate::{
    FlowChallenge, RequireImpersonationCondition, RequireRoleAuthenticator, RequireRoleCondition,
    RequireRoleGate,
};
pub use policy::{default_registry, PolicyRegistry, PolicyRegistryBuilder, PolicyTable};
pub use roles::RoleGraphResolver;
pub use subject::{ImpersonationMode, NotApplicable, Resolution, Subject, SubjectResolver};
pub use types::{RequestContext, Verdict};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
