//! JSON content documents.
//!
//! ```json
//! {
//!   "id": "registry",
//!   "tag": "6f0a3e3c-0d56-4c4f-9a0e-3c5d0a4f7d11",
//!   "items": {
//!     "owners": {
//!       "type": "string",
//!       "keys": ["string"],
//!       "data": { "alpha": "alice" }
//!     }
//!   }
//! }
//! ```
//!
//! Each level of `data` is an object keyed by the corresponding key type;
//! leaves are JSON strings, numbers, booleans or arrays of strings for
//! collection and flags types.

use super::{Content, ContentItem};
use crate::core::{AttributeValue, Type, Types};
use crate::{Error, Result};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ContentDocument {
    id: String,
    #[serde(default)]
    tag: Option<Uuid>,
    #[serde(default)]
    items: BTreeMap<String, ItemDocument>,
}

#[derive(Debug, Deserialize)]
struct ItemDocument {
    #[serde(rename = "type")]
    type_key: String,
    #[serde(default)]
    keys: Vec<String>,
    data: serde_json::Value,
}

impl Content {
    /// Load a content from a JSON document.
    pub fn from_json(text: &str, types: &Types) -> Result<Self> {
        let doc: ContentDocument = serde_json::from_str(text)?;
        let mut content = Content::new(doc.id, doc.tag);

        for (id, item) in doc.items {
            let t = types.resolve(&item.type_key)?.clone();
            let keys = item
                .keys
                .iter()
                .map(|k| types.resolve(k).cloned())
                .collect::<Result<Vec<_>>>()?;

            let mut built = ContentItem::new(id, t, keys)
                .map_err(|e| Error::content_with_id(e.to_string(), content.id()))?;
            let mut path = Vec::new();
            load_level(&mut built, &item.data, &mut path)
                .map_err(|e| Error::content_with_id(format!("{}: {}", built.id(), e), content.id()))?;
            content.insert_item(built);
        }

        Ok(content)
    }

    /// Load a content from a JSON file.
    pub fn from_file(path: impl AsRef<Path>, types: &Types) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text, types)
    }
}

fn load_level(item: &mut ContentItem, data: &serde_json::Value, path: &mut Vec<String>) -> Result<()> {
    if path.len() == item.keys().len() {
        let value = json_value(item.get_type(), data)?;
        let keys = item.parse_keys(path)?;
        *item = item.insert(&keys, value)?;
        return Ok(());
    }

    let map = data.as_object().ok_or_else(|| {
        Error::content(format!("expected object at level {}", path.len()))
    })?;
    for (key, child) in map {
        path.push(key.clone());
        load_level(item, child, path)?;
        path.pop();
    }
    Ok(())
}

fn json_value(t: &Type, data: &serde_json::Value) -> Result<AttributeValue> {
    use serde_json::Value;

    match data {
        Value::String(s) => AttributeValue::parse(t, s),
        Value::Bool(b) => AttributeValue::parse(t, &b.to_string()),
        Value::Number(n) => AttributeValue::parse(t, &n.to_string()),
        Value::Array(items) => {
            let quoted = items
                .iter()
                .map(|item| match item {
                    Value::String(_) => Ok(item.to_string()),
                    other => Err(Error::content(format!("expected string but got {}", other))),
                })
                .collect::<Result<Vec<_>>>()?;
            AttributeValue::parse(t, &quoted.join(","))
        }
        other => Err(Error::content(format!("unsupported value {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Domain;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "id": "registry",
        "tag": "6f0a3e3c-0d56-4c4f-9a0e-3c5d0a4f7d11",
        "items": {
            "owners": {
                "type": "string",
                "keys": ["string"],
                "data": {"alpha": "alice", "beta": "bob"}
            },
            "zones": {
                "type": "set of strings",
                "keys": ["network", "domain"],
                "data": {
                    "10.0.0.0/8": {"example.com": ["internal", "corp"]}
                }
            },
            "limit": {
                "type": "integer",
                "data": 42
            }
        }
    }"#;

    #[test]
    fn test_load_document() {
        let content = Content::from_json(DOCUMENT, &Types::new()).unwrap();
        assert_eq!(content.id(), "registry");
        assert!(content.tag().is_some());
        assert_eq!(content.item_ids(), vec!["limit", "owners", "zones"]);

        let v = content
            .get("owners", &[AttributeValue::new_string("beta")])
            .unwrap();
        assert_eq!(v.as_str().unwrap(), "bob");

        let v = content
            .get(
                "zones",
                &[
                    AttributeValue::new_address("10.20.30.40".parse().unwrap()),
                    AttributeValue::new_domain(Domain::new("www.example.com").unwrap()),
                ],
            )
            .unwrap();
        let zones: Vec<&String> = v.as_set_of_strings().unwrap().iter_ranked().collect();
        assert_eq!(zones, vec!["internal", "corp"]);

        assert_eq!(content.get("limit", &[]).unwrap().as_integer().unwrap(), 42);
    }

    #[test]
    fn test_custom_flags_type() {
        let types = Types::new()
            .with_flags(crate::core::FlagsType::new("Perm", ["read", "write"]).unwrap())
            .unwrap();
        let doc = r#"{"id": "c", "items": {"p": {"type": "perm", "keys": ["string"], "data": {"u": ["write"]}}}}"#;

        let content = Content::from_json(doc, &types).unwrap();
        let v = content.get("p", &[AttributeValue::new_string("u")]).unwrap();
        assert_eq!(v.as_flags8().unwrap(), 0b10);
    }

    #[test]
    fn test_invalid_documents() {
        let types = Types::new();
        assert!(Content::from_json("not json", &types).is_err());
        assert!(Content::from_json(r#"{"id": "c", "items": {"x": {"type": "nope", "data": 1}}}"#, &types).is_err());
        assert!(Content::from_json(
            r#"{"id": "c", "items": {"x": {"type": "integer", "keys": ["string"], "data": 1}}}"#,
            &types
        )
        .is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let content = Content::from_file(file.path(), &Types::new()).unwrap();
        assert_eq!(content.item_ids().len(), 3);
        assert!(Content::from_file("/nonexistent/content.json", &Types::new()).is_err());
    }
}
