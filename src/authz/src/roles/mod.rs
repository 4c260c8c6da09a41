//! Composite role resolution
//!
//! Answers whether one role entails another through composite edges, and
//! flattens a role into everything it grants. Role graphs may contain
//! cycles, so every walk tracks the roles it has already visited.
//!
//! # Example
//!
//! ```rust
//! use admingate_authz::roles::RoleGraphResolver;
//! use admingate_core::{Role, RoleGraph, RoleId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = RoleGraph::builder();
//! builder.add_role(Role::realm("admin").with_composite(RoleId::realm("viewer")))?;
//! builder.add_role(Role::realm("viewer"))?;
//! let graph = builder.build()?;
//!
//! let resolver = RoleGraphResolver::new(&graph);
//! assert!(resolver.entails(&RoleId::realm("admin"), &RoleId::realm("viewer")));
//! assert!(!resolver.entails(&RoleId::realm("viewer"), &RoleId::realm("admin")));
//! # Ok(())
//! # }
//! ```

pub mod resolver;


pub use resolver::RoleGraphResolver;
