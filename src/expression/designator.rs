use crate::core::{Attribute, AttributeValue, Context};
use crate::Result;

/// Expression reading a request attribute from the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDesignator {
    attribute: Attribute,
}

impl AttributeDesignator {
    /// Create a designator for the attribute.
    pub fn new(attribute: Attribute) -> Self {
        Self { attribute }
    }

    /// Designated attribute.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Look the attribute up in the context.
    pub fn calculate(&self, ctx: &Context) -> Result<AttributeValue> {
        ctx.get(&self.attribute).cloned()
    }
}
