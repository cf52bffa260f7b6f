//! Versioned reference data used by selector expressions.
//!
//! A [`ContentStorage`] holds contents by id. Each [`Content`] is a set of
//! typed lookup tables ([`ContentItem`]) and an optional tag identifying its
//! version. Storages are immutable values: updates go through a
//! [`ContentTransaction`] whose commit returns a new storage sharing every
//! untouched content with the old one.

mod item;
mod loader;
mod update;

pub use item::{ContentItem, ContentKey, ContentNode};
pub use update::{ContentCommand, ContentEntry, ContentTransaction, ContentUpdate};

use crate::core::AttributeValue;
use crate::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A named collection of content items.
#[derive(Debug, Clone)]
pub struct Content {
    id: String,
    tag: Option<Uuid>,
    items: HashMap<String, Arc<ContentItem>>,
}

impl Content {
    /// Create an empty content.
    pub fn new(id: impl Into<String>, tag: Option<Uuid>) -> Self {
        Self {
            id: id.into(),
            tag,
            items: HashMap::new(),
        }
    }

    /// Add or replace an item.
    pub fn with_item(mut self, item: ContentItem) -> Self {
        self.insert_item(item);
        self
    }

    /// Content id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Version tag, if the content is versioned.
    pub fn tag(&self) -> Option<Uuid> {
        self.tag
    }

    /// Item by id.
    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.items.get(id).map(AsRef::as_ref)
    }

    /// Ids of all items, sorted.
    pub fn item_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.items.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a value of an item.
    pub fn get(&self, item_id: &str, path: &[AttributeValue]) -> Result<AttributeValue> {
        self.item(item_id)
            .ok_or_else(|| {
                Error::missing_value(format!("content {} has no item {}", self.id, item_id))
            })?
            .get(path)
    }

    fn set_tag(&mut self, tag: Option<Uuid>) {
        self.tag = tag;
    }

    fn insert_item(&mut self, item: ContentItem) {
        self.items.insert(item.id().to_string(), Arc::new(item));
    }

    fn remove_item(&mut self, id: &str) -> Option<Arc<ContentItem>> {
        self.items.remove(id)
    }
}

/// Contents visible to requests, by id.
#[derive(Debug, Clone, Default)]
pub struct ContentStorage {
    contents: HashMap<String, Arc<Content>>,
}

impl ContentStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the storage with the content added or replaced.
    pub fn with(&self, content: Content) -> Self {
        let mut contents = self.contents.clone();
        contents.insert(content.id().to_string(), Arc::new(content));
        Self { contents }
    }

    /// Copy of the storage without the content.
    pub fn without(&self, id: &str) -> Self {
        let mut contents = self.contents.clone();
        contents.remove(id);
        Self { contents }
    }

    /// Content by id.
    pub fn get(&self, id: &str) -> Option<&Content> {
        self.contents.get(id).map(AsRef::as_ref)
    }

    /// Look up a value of a content item.
    ///
    /// Missing content, item or key produces a missing value error.
    pub fn get_value(
        &self,
        content_id: &str,
        item_id: &str,
        path: &[AttributeValue],
    ) -> Result<AttributeValue> {
        self.get(content_id)
            .ok_or_else(|| Error::missing_value(format!("no content {}", content_id)))?
            .get(item_id, path)
    }

    /// Ids of all contents, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.contents.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of contents.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Check if the storage has no contents.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Start a transaction on a tagged content.
    ///
    /// The content must exist, be tagged and carry exactly `tag`.
    pub fn new_transaction(&self, content_id: &str, tag: Uuid) -> Result<ContentTransaction> {
        let content = self.get(content_id).ok_or_else(|| {
            Error::content_with_id(format!("no content {}", content_id), content_id)
        })?;
        check_tag(content, tag)?;
        Ok(ContentTransaction::new(content.clone(), tag))
    }
}

fn check_tag(content: &Content, tag: Uuid) -> Result<()> {
    let current = content.tag().ok_or_else(|| Error::MissingTag {
        id: content.id().to_string(),
    })?;
    if current != tag {
        return Err(Error::TagMismatch {
            expected: current.to_string(),
            actual: tag.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Type;

    pub(super) fn sample(tag: Option<Uuid>) -> Content {
        let item = ContentItem::new("owners", Type::String, vec![Type::String]).unwrap();
        let keys = item.parse_keys(&["alpha".to_string()]).unwrap();
        let item = item
            .insert(&keys, AttributeValue::new_string("alice"))
            .unwrap();
        Content::new("registry", tag).with_item(item)
    }

    #[test]
    fn test_storage_lookup() {
        let storage = ContentStorage::new().with(sample(None));
        let key = [AttributeValue::new_string("alpha")];

        let v = storage.get_value("registry", "owners", &key).unwrap();
        assert_eq!(v.as_str().unwrap(), "alice");

        assert!(storage.get_value("nope", "owners", &key).unwrap_err().is_missing_value());
        assert!(storage.get_value("registry", "nope", &key).unwrap_err().is_missing_value());
        let other = [AttributeValue::new_string("beta")];
        assert!(storage.get_value("registry", "owners", &other).unwrap_err().is_missing_value());
    }

    #[test]
    fn test_storage_is_persistent() {
        let first = ContentStorage::new().with(sample(None));
        let second = first.without("registry");

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_transaction_requires_tag() {
        let tag = Uuid::new_v4();
        let untagged = ContentStorage::new().with(sample(None));
        assert!(matches!(
            untagged.new_transaction("registry", tag),
            Err(Error::MissingTag { .. })
        ));

        let tagged = ContentStorage::new().with(sample(Some(tag)));
        assert!(matches!(
            tagged.new_transaction("registry", Uuid::new_v4()),
            Err(Error::TagMismatch { .. })
        ));
        assert!(tagged.new_transaction("registry", tag).is_ok());
    }
}
