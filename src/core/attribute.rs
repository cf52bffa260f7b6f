//! Attribute descriptors and assignments.

use super::{Context, Type};
use crate::expression::Expression;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute descriptor: an id and the type of its values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    id: String,
    t: Type,
}

impl Attribute {
    /// Create an attribute descriptor.
    pub fn new(id: impl Into<String>, t: Type) -> Self {
        Self { id: id.into(), t }
    }

    /// Attribute id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attribute type.
    pub fn get_type(&self) -> &Type {
        &self.t
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.({})", self.id, self.t.name())
    }
}

/// Binding of an expression to an output attribute.
///
/// Used for obligations. The expression is calculated only when the
/// assignment is serialized.
#[derive(Debug, Clone)]
pub struct AttributeAssignment {
    attribute: Attribute,
    expression: Expression,
}

/// Serialized form of an assignment handed to marshaling layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedAssignment {
    /// Attribute id
    pub id: String,
    /// Type key of the attribute
    #[serde(rename = "type")]
    pub type_key: String,
    /// Canonical string form of the value
    pub value: String,
}

impl AttributeAssignment {
    /// Bind an expression to an attribute.
    pub fn new(attribute: Attribute, expression: impl Into<Expression>) -> Self {
        Self {
            attribute,
            expression: expression.into(),
        }
    }

    /// Target attribute.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Bound expression.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Calculate the assigned value.
    pub fn calculate(&self, ctx: &Context) -> Result<super::AttributeValue> {
        self.expression.calculate(ctx)
    }

    /// Calculate and serialize the assignment.
    pub fn serialize(&self, ctx: &Context) -> Result<SerializedAssignment> {
        let value = self.calculate(ctx)?;
        if value.get_type() != self.attribute.get_type() {
            return Err(Error::AssignmentTypeMismatch {
                id: self.attribute.id().to_string(),
                expected: self.attribute.get_type().name().to_string(),
                actual: value.get_type().name().to_string(),
            });
        }

        Ok(SerializedAssignment {
            id: self.attribute.id().to_string(),
            type_key: self.attribute.get_type().key(),
            value: value.serialize()?,
        })
    }
}
