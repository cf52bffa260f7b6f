//! # PDP Engine
//!
//! Attribute-based policy decision point. Policies are trees of policy sets,
//! policies and rules; each node has a target, a combining algorithm and
//! obligations. Requests carry typed attributes and get one of Permit, Deny,
//! NotApplicable or Indeterminate back, with the obligations of the decisive
//! branch.
//!
//! ## Features
//!
//! - **Typed attributes**: builtin value types plus user-defined flags types
//! - **Expressions**: designators, content selectors and an overloaded
//!   function library
//! - **Combining algorithms**: first-applicable, deny/permit-overrides and
//!   mappers dispatching on an attribute value
//! - **Versioned updates**: tagged policy and content storages with
//!   transactional updates
//! - **Host**: lock-free reads through atomic root swaps, a decision cache
//!   and decision counters
//!
//! ## Quick Start
//!
//! ```rust
//! use pdp_engine::core::{AttributeValue, Type};
//! use pdp_engine::expression::{Expression, FunctionRegistry};
//! use pdp_engine::policy::{Policy, PolicySet, Rule, Target};
//! use pdp_engine::{PolicyEngine, Request};
//!
//! fn main() -> pdp_engine::Result<()> {
//!     let is_admin = FunctionRegistry::builtin().make(
//!         "equal",
//!         vec![
//!             Expression::designator("role", Type::String),
//!             AttributeValue::new_string("admin").into(),
//!         ],
//!     )?;
//!
//!     let policy = Policy::builder("admins")
//!         .rule(Rule::permit("permit-admins").with_target(Target::matching(is_admin)))
//!         .build()?;
//!     let root = PolicySet::builder("root").child(policy).build()?;
//!
//!     let engine = PolicyEngine::builder().with_policies(root, None).build()?;
//!
//!     let request = Request::builder().attribute("role", "admin").build();
//!     assert!(engine.evaluate(&request).is_allowed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod core;
pub mod error;
pub mod expression;
pub mod policy;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{PolicyDecision, PolicyEngine, PolicyEngineBuilder, Request};
pub use config::Config;
pub use error::{Error, Result};
pub use policy::{DecisionType, Effect, Evaluable, Policy, PolicySet, Rule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
