//! Typed expressions.
//!
//! An [`Expression`] is a literal value, an attribute designator, a content
//! selector or a function call. Every expression knows its result type
//! without a context; [`Expression::calculate`] evaluates it against one.
//! Function calls are built through a [`FunctionRegistry`], which picks an
//! overload from the static types of the arguments.

mod designator;
mod functions;
mod registry;
mod selector;

pub use designator::AttributeDesignator;
pub use functions::Function;
pub use registry::{FunctionMaker, FunctionRegistry, Validator};
pub use selector::Selector;

use crate::core::{Attribute, AttributeValue, Context, Type};
use crate::Result;

/// An expression of the policy language.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Literal value
    Value(AttributeValue),
    /// Request attribute lookup
    Designator(AttributeDesignator),
    /// Content storage lookup
    Selector(Selector),
    /// Function call
    Function(Function),
}

impl Expression {
    /// Create an attribute designator expression.
    pub fn designator(id: impl Into<String>, t: Type) -> Self {
        Expression::Designator(AttributeDesignator::new(Attribute::new(id, t)))
    }

    /// Static result type.
    pub fn result_type(&self) -> &Type {
        match self {
            Expression::Value(v) => v.get_type(),
            Expression::Designator(d) => d.attribute().get_type(),
            Expression::Selector(s) => s.result_type(),
            Expression::Function(f) => f.result_type(),
        }
    }

    /// Evaluate the expression.
    pub fn calculate(&self, ctx: &Context) -> Result<AttributeValue> {
        match self {
            Expression::Value(v) => Ok(v.clone()),
            Expression::Designator(d) => d.calculate(ctx),
            Expression::Selector(s) => s.calculate(ctx),
            Expression::Function(f) => f.calculate(ctx),
        }
    }

    /// Attribute read by this expression if it is a designator.
    pub fn as_designator(&self) -> Option<&Attribute> {
        match self {
            Expression::Designator(d) => Some(d.attribute()),
            _ => None,
        }
    }

    /// Literal value if this expression is one.
    pub fn as_value(&self) -> Option<&AttributeValue> {
        match self {
            Expression::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<AttributeValue> for Expression {
    fn from(v: AttributeValue) -> Self {
        Expression::Value(v)
    }
}

impl From<AttributeDesignator> for Expression {
    fn from(d: AttributeDesignator) -> Self {
        Expression::Designator(d)
    }
}

impl From<Selector> for Expression {
    fn from(s: Selector) -> Self {
        Expression::Selector(s)
    }
}

impl From<Function> for Expression {
    fn from(f: Function) -> Self {
        Expression::Function(f)
    }
}
