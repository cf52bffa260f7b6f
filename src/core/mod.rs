//! Attribute model: types, values, attributes and the request context.

mod adapters;
mod attribute;
mod collections;
mod context;
mod domain;
mod types;
mod value;

pub use adapters::{AsAttribute, FromAttribute};
pub use attribute::{Attribute, AttributeAssignment, SerializedAssignment};
pub use collections::{DomainSet, NetworkSet, RankedSet, StringSet};
pub use context::Context;
pub use domain::Domain;
pub use types::{FlagsType, Type, Types, BUILTIN_TYPES, MAX_FLAGS};
pub use value::{AttributeValue, UNDEFINED_VALUE};
