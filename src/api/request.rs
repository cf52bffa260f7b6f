//! Decision requests.

use crate::content::ContentStorage;
use crate::core::{AsAttribute, AttributeValue, Context, SerializedAssignment, Types};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attributes of one decision request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    attributes: Vec<(String, AttributeValue)>,
}

/// Wire form of a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestDocument {
    /// Attributes as id, type key and canonical value
    #[serde(default)]
    pub attributes: Vec<SerializedAssignment>,
}

impl Request {
    /// Create a request builder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Request attributes in insertion order.
    pub fn attributes(&self) -> &[(String, AttributeValue)] {
        &self.attributes
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the request has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Build the evaluation context of the request.
    pub fn context(&self, content: Option<Arc<ContentStorage>>) -> Result<Context> {
        Context::new(content, self.attributes.len(), |i| {
            self.attributes
                .get(i)
                .cloned()
                .ok_or_else(|| Error::internal(format!("request has no attribute {}", i)))
        })
    }

    /// Wire form of the request.
    pub fn to_document(&self) -> Result<RequestDocument> {
        let attributes = self
            .attributes
            .iter()
            .map(|(id, v)| {
                Ok(SerializedAssignment {
                    id: id.clone(),
                    type_key: v.get_type().key(),
                    value: v.serialize()?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(RequestDocument { attributes })
    }

    /// Decode a request from its wire form.
    pub fn from_document(document: &RequestDocument, types: &Types) -> Result<Self> {
        let attributes = document
            .attributes
            .iter()
            .map(|a| {
                let t = types.resolve(&a.type_key)?;
                Ok((a.id.clone(), AttributeValue::parse(t, &a.value)?))
            })
            .collect::<Result<_>>()?;
        Ok(Self { attributes })
    }

    /// Decode a request from JSON.
    pub fn from_json(json: &str, types: &Types) -> Result<Self> {
        let document: RequestDocument = serde_json::from_str(json)?;
        Self::from_document(&document, types)
    }

    /// Cache key of the request.
    ///
    /// The key doesn't depend on attribute order.
    pub fn cache_key(&self) -> Result<String> {
        let mut document = self.to_document()?;
        document
            .attributes
            .sort_by(|a, b| (&a.id, &a.type_key).cmp(&(&b.id, &b.type_key)));

        let json = serde_json::to_string(&document)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Builder for requests.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    attributes: Vec<(String, AttributeValue)>,
}

impl RequestBuilder {
    /// Add an attribute from a host value.
    pub fn attribute(self, id: impl Into<String>, value: impl AsAttribute) -> Self {
        self.value(id, value.as_attribute())
    }

    /// Add an attribute value.
    pub fn value(mut self, id: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push((id.into(), value));
        self
    }

    /// Build the request.
    pub fn build(self) -> Request {
        Request {
            attributes: self.attributes,
        }
    }
}
