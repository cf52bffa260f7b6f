//! Per-request attribute environment.

use super::{Attribute, AttributeValue};
use crate::content::ContentStorage;
use crate::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;

/// Attributes of one request plus the content storage visible to it.
///
/// A context is read-only once built. The default context is empty and has
/// no content; it serves expressions that don't depend on a request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    attributes: HashMap<String, Vec<AttributeValue>>,
    content: Option<Arc<ContentStorage>>,
}

impl Context {
    /// Build a context by calling `f` once for each of `count` attributes.
    ///
    /// An error from the generator aborts construction, as does an
    /// attribute supplied twice with the same id and type.
    pub fn new<F>(content: Option<Arc<ContentStorage>>, count: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<(String, AttributeValue)>,
    {
        let mut ctx = Self {
            attributes: HashMap::with_capacity(count),
            content,
        };

        for i in 0..count {
            let (id, value) = f(i)?;
            ctx.insert(id, value)?;
        }

        Ok(ctx)
    }

    /// Build a context from prepared id/value pairs.
    pub fn from_values<I, S>(content: Option<Arc<ContentStorage>>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, AttributeValue)>,
        S: Into<String>,
    {
        let mut ctx = Self {
            attributes: HashMap::new(),
            content,
        };
        for (id, value) in values {
            ctx.insert(id.into(), value)?;
        }
        Ok(ctx)
    }

    fn insert(&mut self, id: String, value: AttributeValue) -> Result<()> {
        if value.is_undefined() {
            return Err(Error::context(format!("attribute {} has undefined value", id)));
        }

        let values = self.attributes.entry(id.clone()).or_default();
        if values.iter().any(|v| v.get_type() == value.get_type()) {
            return Err(Error::context(format!(
                "duplicate attribute {} of type {}",
                id,
                value.get_type().name()
            )));
        }
        values.push(value);
        Ok(())
    }

    /// Resolve an attribute to its value.
    ///
    /// Absent attributes and attributes present with another type both
    /// produce a missing attribute error.
    pub fn get(&self, attribute: &Attribute) -> Result<&AttributeValue> {
        self.attributes
            .get(attribute.id())
            .and_then(|values| {
                values
                    .iter()
                    .find(|v| v.get_type() == attribute.get_type())
            })
            .ok_or_else(|| {
                Error::missing_attribute(attribute.id(), attribute.get_type().name())
            })
    }

    /// Content storage visible to the request.
    pub fn content(&self) -> Option<&ContentStorage> {
        self.content.as_deref()
    }

    /// Number of attribute values in the context.
    pub fn len(&self) -> usize {
        self.attributes.values().map(Vec::len).sum()
    }

    /// Check if the context holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
