//! Policy data structures and evaluation.
//!
//! This module defines rules, policies and policy sets, the combining
//! algorithms that fold their results, and the versioned storage that
//! publishes policy trees.

mod algorithm;
mod decision;
mod evaluable;
mod response;
mod rule;
mod storage;
mod target;

pub use algorithm::{
    Combinable, CombiningAlgorithm, FlagsMapperAlgorithm, MapperAlgorithm, MapperOrder,
};
pub use decision::{DecisionType, Effect};
pub use evaluable::{
    Evaluable, Policy, PolicyBuilder, PolicyItem, PolicySet, PolicySetBuilder,
};
pub use response::Response;
pub use rule::Rule;
pub use storage::{PolicyCommand, PolicyStorage, PolicyTransaction, PolicyUpdate};
pub use target::{Target, TargetResult};
