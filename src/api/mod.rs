//! Public API for the policy engine.
//!
//! This module provides the main interface for interacting with the policy
//! engine: the `PolicyEngine` host, requests and decisions.

mod decision;
mod engine;
mod request;

pub use decision::PolicyDecision;
pub use engine::{EngineMetrics, PolicyEngine, PolicyEngineBuilder};
pub use request::{Request, RequestBuilder, RequestDocument};
