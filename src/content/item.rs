//! Content items and their lookup trees.

use crate::core::{AttributeValue, Domain, Type, UNDEFINED_VALUE};
use crate::{Error, Result};

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// A key of one level of a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKey {
    /// Key of a string map
    String(String),
    /// Key of a network map
    Network(IpNet),
    /// Key of a domain map
    Domain(Domain),
}

impl ContentKey {
    /// Parse a key for a level of the given type.
    pub fn parse(t: &Type, text: &str) -> Result<Self> {
        match t {
            Type::String => Ok(ContentKey::String(text.to_string())),
            Type::Address | Type::Network => parse_network(text).map(ContentKey::Network),
            Type::Domain => Domain::new(text).map(ContentKey::Domain),
            other => Err(invalid_key_type(other)),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKey::String(s) => write!(f, "{:?}", s),
            ContentKey::Network(n) => write!(f, "{}", n),
            ContentKey::Domain(d) => write!(f, "{}", d),
        }
    }
}

fn parse_network(text: &str) -> Result<IpNet> {
    if let Ok(net) = text.parse::<IpNet>() {
        return Ok(net.trunc());
    }
    text.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|e| Error::invalid_value("Network", text, e.to_string()))
}

fn invalid_key_type(t: &Type) -> Error {
    Error::content(format!("{} can't be a content key type", t.name()))
}

/// A node of a content item's lookup tree.
#[derive(Debug, Clone)]
pub enum ContentNode {
    /// Leaf value
    Value(AttributeValue),
    /// Map keyed by exact string
    Strings(BTreeMap<String, Arc<ContentNode>>),
    /// Map keyed by network, looked up by longest prefix
    Networks(BTreeMap<IpNet, Arc<ContentNode>>),
    /// Map keyed by domain, looked up by closest parent
    Domains(BTreeMap<Domain, Arc<ContentNode>>),
}

impl ContentNode {
    /// Empty map for a level of the given key type.
    pub fn empty(key_type: &Type) -> Result<Self> {
        match key_type {
            Type::String => Ok(ContentNode::Strings(BTreeMap::new())),
            Type::Address | Type::Network => Ok(ContentNode::Networks(BTreeMap::new())),
            Type::Domain => Ok(ContentNode::Domains(BTreeMap::new())),
            other => Err(invalid_key_type(other)),
        }
    }

    /// Look up the child matching a key value.
    pub fn lookup(&self, key: &AttributeValue) -> Result<Option<&ContentNode>> {
        match (self, key.get_type()) {
            (ContentNode::Strings(m), Type::String) => Ok(m.get(key.as_str()?).map(AsRef::as_ref)),
            (ContentNode::Networks(m), Type::Address) => {
                Ok(longest_prefix(m, IpNet::from(key.as_address()?)))
            }
            (ContentNode::Networks(m), Type::Network) => Ok(longest_prefix(m, key.as_network()?)),
            (ContentNode::Domains(m), Type::Domain) => {
                let domain = key.as_domain()?;
                Ok(domain
                    .ancestors()
                    .find_map(|name| m.get(&Domain::from_normalized(name)))
                    .map(AsRef::as_ref))
            }
            (ContentNode::Value(_), _) => Err(Error::content("too many keys for content item")),
            (node, t) => Err(Error::value_type(node.key_type_name(), t.name())),
        }
    }

    fn key_type_name(&self) -> &'static str {
        match self {
            ContentNode::Value(_) => "no",
            ContentNode::Strings(_) => "String",
            ContentNode::Networks(_) => "Address or Network",
            ContentNode::Domains(_) => "Domain",
        }
    }

    fn child(&self, key: &ContentKey) -> Option<&Arc<ContentNode>> {
        match (self, key) {
            (ContentNode::Strings(m), ContentKey::String(k)) => m.get(k),
            (ContentNode::Networks(m), ContentKey::Network(k)) => m.get(k),
            (ContentNode::Domains(m), ContentKey::Domain(k)) => m.get(k),
            _ => None,
        }
    }

    fn with_child(&self, key: &ContentKey, node: ContentNode) -> Result<ContentNode> {
        let node = Arc::new(node);
        let mut out = self.clone();
        match (&mut out, key) {
            (ContentNode::Strings(m), ContentKey::String(k)) => {
                m.insert(k.clone(), node);
            }
            (ContentNode::Networks(m), ContentKey::Network(k)) => {
                m.insert(*k, node);
            }
            (ContentNode::Domains(m), ContentKey::Domain(k)) => {
                m.insert(k.clone(), node);
            }
            _ => return Err(Error::content(format!("key {} doesn't fit the map", key))),
        }
        Ok(out)
    }

    fn without_child(&self, key: &ContentKey) -> Option<ContentNode> {
        let mut out = self.clone();
        let removed = match (&mut out, key) {
            (ContentNode::Strings(m), ContentKey::String(k)) => m.remove(k),
            (ContentNode::Networks(m), ContentKey::Network(k)) => m.remove(k),
            (ContentNode::Domains(m), ContentKey::Domain(k)) => m.remove(k),
            _ => None,
        };
        removed.map(|_| out)
    }
}

fn longest_prefix(m: &BTreeMap<IpNet, Arc<ContentNode>>, net: IpNet) -> Option<&ContentNode> {
    (0..=net.prefix_len())
        .rev()
        .filter_map(|len| IpNet::new(net.addr(), len).ok())
        .find_map(|candidate| m.get(&candidate.trunc()))
        .map(AsRef::as_ref)
}

/// A named, typed lookup table of a content.
///
/// Each level of the tree is keyed by one of the item's key types; the
/// leaves hold values of the item's result type.
#[derive(Debug, Clone)]
pub struct ContentItem {
    id: String,
    t: Type,
    keys: Vec<Type>,
    root: Arc<ContentNode>,
}

impl ContentItem {
    /// Create an empty item.
    pub fn new(id: impl Into<String>, t: Type, keys: Vec<Type>) -> Result<Self> {
        let root = match keys.first() {
            Some(first) => ContentNode::empty(first)?,
            None => ContentNode::Value(UNDEFINED_VALUE),
        };
        for key in &keys {
            ContentNode::empty(key)?;
        }

        Ok(Self {
            id: id.into(),
            t,
            keys,
            root: Arc::new(root),
        })
    }

    /// Item id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type of the item's values.
    pub fn get_type(&self) -> &Type {
        &self.t
    }

    /// Types of the item's key levels.
    pub fn keys(&self) -> &[Type] {
        &self.keys
    }

    /// Root node of the lookup tree.
    pub fn root(&self) -> &ContentNode {
        &self.root
    }

    /// Look up a value by key values, one per level.
    pub fn get(&self, path: &[AttributeValue]) -> Result<AttributeValue> {
        if path.len() != self.keys.len() {
            return Err(Error::content(format!(
                "item {} expects {} keys but got {}",
                self.id,
                self.keys.len(),
                path.len()
            )));
        }

        let mut node = self.root.as_ref();
        for key in path {
            node = node.lookup(key)?.ok_or_else(|| {
                Error::missing_value(format!("item {} has no value for {}", self.id, key))
            })?;
        }

        match node {
            ContentNode::Value(v) if v.is_undefined() => Err(Error::missing_value(format!(
                "item {} has no value",
                self.id
            ))),
            ContentNode::Value(v) => Ok(v.clone()),
            _ => Err(Error::internal(format!("item {} ends with a map", self.id))),
        }
    }

    /// Parse path elements into keys of the item's levels.
    ///
    /// The path may be shorter than the number of levels to address a
    /// subtree.
    pub fn parse_keys(&self, path: &[String]) -> Result<Vec<ContentKey>> {
        if path.len() > self.keys.len() {
            return Err(Error::content(format!(
                "item {} expects {} keys but got {}",
                self.id,
                self.keys.len(),
                path.len()
            )));
        }
        self.keys
            .iter()
            .zip(path)
            .map(|(t, text)| ContentKey::parse(t, text))
            .collect()
    }

    /// Copy of the item with a value stored under the keys.
    pub fn insert(&self, keys: &[ContentKey], value: AttributeValue) -> Result<Self> {
        if value.get_type() != &self.t {
            return Err(Error::value_type(self.t.name(), value.get_type().name()));
        }
        if keys.len() != self.keys.len() {
            return Err(Error::content(format!(
                "item {} expects {} keys but got {}",
                self.id,
                self.keys.len(),
                keys.len()
            )));
        }

        let root = insert_node(&self.root, &self.keys, keys, value)?;
        Ok(Self {
            root: Arc::new(root),
            ..self.clone()
        })
    }

    /// Copy of the item without the subtree under the keys.
    pub fn remove(&self, keys: &[ContentKey]) -> Result<Self> {
        if keys.is_empty() || keys.len() > self.keys.len() {
            return Err(Error::content(format!(
                "item {} can't remove by {} keys",
                self.id,
                keys.len()
            )));
        }

        let root = remove_node(&self.root, keys).ok_or_else(|| {
            Error::content_with_id(
                format!("item {} has no entry to remove", self.id),
                self.id.clone(),
            )
        })?;
        Ok(Self {
            root: Arc::new(root),
            ..self.clone()
        })
    }
}

fn insert_node(
    node: &ContentNode,
    types: &[Type],
    keys: &[ContentKey],
    value: AttributeValue,
) -> Result<ContentNode> {
    let Some((key, rest)) = keys.split_first() else {
        return Ok(ContentNode::Value(value));
    };

    let child = match (node.child(key), types.get(1)) {
        (Some(child), _) => insert_node(child, &types[1..], rest, value)?,
        (None, Some(next)) => insert_node(&ContentNode::empty(next)?, &types[1..], rest, value)?,
        (None, None) => ContentNode::Value(value),
    };
    node.with_child(key, child)
}

fn remove_node(node: &ContentNode, keys: &[ContentKey]) -> Option<ContentNode> {
    let (key, rest) = keys.split_first()?;
    if rest.is_empty() {
        return node.without_child(key);
    }
    let child = remove_node(node.child(key)?, rest)?;
    node.with_child(key, child).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ContentItem {
        let item = ContentItem::new("zones", Type::String, vec![Type::Network, Type::Domain]).unwrap();
        let add = |item: &ContentItem, net: &str, domain: &str, v: &str| {
            let keys = item
                .parse_keys(&[net.to_string(), domain.to_string()])
                .unwrap();
            item.insert(&keys, AttributeValue::new_string(v)).unwrap()
        };
        let item = add(&item, "10.0.0.0/8", "example.com", "wide");
        let item = add(&item, "10.1.0.0/16", "example.com", "narrow");
        add(&item, "10.1.0.0/16", "www.example.com", "www")
    }

    fn address(v: &str) -> AttributeValue {
        AttributeValue::new_address(v.parse().unwrap())
    }

    fn domain(v: &str) -> AttributeValue {
        AttributeValue::new_domain(Domain::new(v).unwrap())
    }

    #[test]
    fn test_longest_prefix_and_parent_domain() {
        let item = item();

        let v = item.get(&[address("10.2.3.4"), domain("example.com")]).unwrap();
        assert_eq!(v.as_str().unwrap(), "wide");

        let v = item.get(&[address("10.1.3.4"), domain("mail.example.com")]).unwrap();
        assert_eq!(v.as_str().unwrap(), "narrow");

        let v = item.get(&[address("10.1.3.4"), domain("a.www.example.com")]).unwrap();
        assert_eq!(v.as_str().unwrap(), "www");
    }

    #[test]
    fn test_missing_key_is_missing_value() {
        let item = item();
        let err = item.get(&[address("192.0.2.1"), domain("example.com")]).unwrap_err();
        assert!(err.is_missing_value());

        let err = item.get(&[address("10.1.0.1")]).unwrap_err();
        assert!(!err.is_missing_value());
    }

    #[test]
    fn test_insert_is_copy_on_write() {
        let before = item();
        let keys = before
            .parse_keys(&["10.0.0.0/8".to_string(), "example.com".to_string()])
            .unwrap();
        let after = before.insert(&keys, AttributeValue::new_string("changed")).unwrap();

        let path = [address("10.9.9.9"), domain("example.com")];
        assert_eq!(before.get(&path).unwrap().as_str().unwrap(), "wide");
        assert_eq!(after.get(&path).unwrap().as_str().unwrap(), "changed");
    }

    #[test]
    fn test_remove() {
        let item = item();
        let keys = item.parse_keys(&["10.1.0.0/16".to_string(), "example.com".to_string()]).unwrap();
        let item = item.remove(&keys).unwrap();

        let err = item.get(&[address("10.1.3.4"), domain("mail.example.com")]).unwrap_err();
        assert!(err.is_missing_value());
        let v = item.get(&[address("10.1.3.4"), domain("www.example.com")]).unwrap();
        assert_eq!(v.as_str().unwrap(), "www");
        assert!(item.remove(&keys).is_err());

        let keys = item.parse_keys(&["10.1.0.0/16".to_string()]).unwrap();
        let item = item.remove(&keys).unwrap();
        let v = item.get(&[address("10.1.3.4"), domain("www.example.com")]).unwrap();
        assert_eq!(v.as_str().unwrap(), "wide");
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let item = ContentItem::new("x", Type::Integer, vec![Type::String]).unwrap();
        let keys = item.parse_keys(&["k".to_string()]).unwrap();
        assert!(item.insert(&keys, AttributeValue::new_string("v")).is_err());
        assert!(ContentItem::new("y", Type::String, vec![Type::Float]).is_err());
    }
}
