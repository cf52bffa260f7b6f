//! Attribute types.

use crate::{Error, Result};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum number of flags a flags type can declare.
pub const MAX_FLAGS: usize = 64;

/// Type of an attribute or of an expression result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Type of the undefined value
    Undefined,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// IPv4 or IPv6 address
    Address,
    /// IPv4 or IPv6 network
    Network,
    /// Domain name
    Domain,
    /// Ranked set of strings
    SetOfStrings,
    /// Set of networks
    SetOfNetworks,
    /// Ranked set of domains
    SetOfDomains,
    /// Ordered list of strings
    ListOfStrings,
    /// Custom flags type
    Flags(Arc<FlagsType>),
}

/// Builtin types in key order.
pub const BUILTIN_TYPES: [Type; 12] = [
    Type::Undefined,
    Type::Boolean,
    Type::String,
    Type::Integer,
    Type::Float,
    Type::Address,
    Type::Network,
    Type::Domain,
    Type::SetOfStrings,
    Type::SetOfNetworks,
    Type::SetOfDomains,
    Type::ListOfStrings,
];

impl Type {
    /// Create a flags type.
    pub fn flags(
        name: impl Into<String>,
        flags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Ok(Type::Flags(Arc::new(FlagsType::new(name, flags)?)))
    }

    /// Stable key used for serialization tags.
    pub fn key(&self) -> String {
        match self {
            Type::Flags(f) => f.name().to_lowercase(),
            other => other.builtin_key().to_string(),
        }
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        match self {
            Type::Undefined => "Undefined",
            Type::Boolean => "Boolean",
            Type::String => "String",
            Type::Integer => "Integer",
            Type::Float => "Float",
            Type::Address => "Address",
            Type::Network => "Network",
            Type::Domain => "Domain",
            Type::SetOfStrings => "Set of Strings",
            Type::SetOfNetworks => "Set of Networks",
            Type::SetOfDomains => "Set of Domains",
            Type::ListOfStrings => "List of Strings",
            Type::Flags(f) => f.name(),
        }
    }

    fn builtin_key(&self) -> &'static str {
        match self {
            Type::Undefined => "undefined",
            Type::Boolean => "boolean",
            Type::String => "string",
            Type::Integer => "integer",
            Type::Float => "float",
            Type::Address => "address",
            Type::Network => "network",
            Type::Domain => "domain",
            Type::SetOfStrings => "set of strings",
            Type::SetOfNetworks => "set of networks",
            Type::SetOfDomains => "set of domains",
            Type::ListOfStrings => "list of strings",
            Type::Flags(_) => "flags",
        }
    }

    /// Check whether a value of `other` can be used where this type is expected.
    pub fn matches(&self, other: &Type) -> bool {
        self == other
    }

    /// Flags type description if this is a flags type.
    pub fn as_flags(&self) -> Option<&FlagsType> {
        match self {
            Type::Flags(f) => Some(f),
            _ => None,
        }
    }

    /// Check if the type is Integer or Float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A named enumeration of up to 64 boolean bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlagsType {
    name: String,
    flags: Vec<String>,
}

impl FlagsType {
    /// Create a flags type with the given flag names in bit order.
    pub fn new(
        name: impl Into<String>,
        flags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::validation_field("Flags type name cannot be empty", "name"));
        }

        let flags: Vec<String> = flags.into_iter().map(Into::into).collect();
        if flags.is_empty() {
            return Err(Error::validation_field(
                format!("Flags type {} requires at least one flag", name),
                "flags",
            ));
        }
        if flags.len() > MAX_FLAGS {
            return Err(Error::validation_field(
                format!(
                    "Flags type {} has {} flags but at most {} are allowed",
                    name,
                    flags.len(),
                    MAX_FLAGS
                ),
                "flags",
            ));
        }

        for (i, flag) in flags.iter().enumerate() {
            if flags[..i].contains(flag) {
                return Err(Error::validation_field(
                    format!("Flags type {} has duplicate flag {}", name, flag),
                    "flags",
                ));
            }
        }

        Ok(Self { name, flags })
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flag names in bit order.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Number of declared flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Flags types always declare at least one flag.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Bit index of the named flag.
    pub fn index_of(&self, flag: &str) -> Option<usize> {
        self.flags.iter().position(|f| f == flag)
    }

    /// Width of the smallest container holding all flags: 8, 16, 32 or 64.
    pub fn bits(&self) -> u32 {
        match self.flags.len() {
            0..=8 => 8,
            9..=16 => 16,
            17..=32 => 32,
            _ => 64,
        }
    }

    /// Mask covering all declared flags.
    pub fn mask(&self) -> u64 {
        if self.flags.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.flags.len()) - 1
        }
    }

    /// Names of the bits set in `mask`, in declaration order.
    pub fn names(&self, mask: u64) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask & (1u64 << i) != 0)
            .map(|(_, f)| f.as_str())
    }
}

/// Registry resolving type keys to types, builtin and custom.
#[derive(Debug, Clone)]
pub struct Types {
    types: HashMap<String, Type>,
}

impl Types {
    /// Create a registry holding the builtin types.
    pub fn new() -> Self {
        let types = BUILTIN_TYPES
            .iter()
            .map(|t| (t.key(), t.clone()))
            .collect();
        Self { types }
    }

    /// Register a custom flags type.
    pub fn with_flags(mut self, flags: FlagsType) -> Result<Self> {
        self.register(Type::Flags(Arc::new(flags)))?;
        Ok(self)
    }

    /// Register a custom type, rejecting key collisions.
    pub fn register(&mut self, t: Type) -> Result<()> {
        let key = t.key();
        if self.types.contains_key(&key) {
            return Err(Error::validation(format!("Type {} is already defined", key)));
        }
        self.types.insert(key, t);
        Ok(())
    }

    /// Look up a type by key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&Type> {
        self.types.get(&key.to_lowercase())
    }

    /// Look up a type by key, failing for unknown keys.
    pub fn resolve(&self, key: &str) -> Result<&Type> {
        self.get(key)
            .ok_or_else(|| Error::validation(format!("Unknown type {}", key)))
    }
}

impl Default for Types {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys_are_unique() {
        let types = Types::new();
        for t in BUILTIN_TYPES.iter() {
            assert_eq!(types.get(&t.key()), Some(t));
        }
        assert_eq!(types.get("Set Of Strings"), Some(&Type::SetOfStrings));
    }

    #[test]
    fn test_flags_widths() {
        let names = |n: usize| (0..n).map(|i| format!("f{:02}", i)).collect::<Vec<_>>();

        assert_eq!(FlagsType::new("f", names(1)).unwrap().bits(), 8);
        assert_eq!(FlagsType::new("f", names(8)).unwrap().bits(), 8);
        assert_eq!(FlagsType::new("f", names(9)).unwrap().bits(), 16);
        assert_eq!(FlagsType::new("f", names(17)).unwrap().bits(), 32);
        assert_eq!(FlagsType::new("f", names(33)).unwrap().bits(), 64);
        assert_eq!(FlagsType::new("f", names(64)).unwrap().mask(), u64::MAX);
        assert!(FlagsType::new("f", names(65)).is_err());
        assert!(FlagsType::new("f", Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_flags_duplicates_rejected() {
        let err = FlagsType::new("colors", ["red", "green", "red"]).unwrap_err();
        assert!(err.to_string().contains("duplicate flag red"));
    }

    #[test]
    fn test_flags_names_in_declaration_order() {
        let ft = FlagsType::new("order", ["third", "first", "second"]).unwrap();
        let names: Vec<_> = ft.names(0b111).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
        assert_eq!(ft.index_of("second"), Some(2));
    }

    #[test]
    fn test_custom_type_registry() {
        let ft = FlagsType::new("Colors", ["red", "green"]).unwrap();
        let types = Types::new().with_flags(ft.clone()).unwrap();

        let t = types.resolve("colors").unwrap();
        assert_eq!(t.as_flags(), Some(&ft));
        assert_eq!(t.key(), "colors");
        assert!(t.matches(&Type::Flags(Arc::new(ft.clone()))));

        assert!(types.with_flags(ft).is_err());
    }
}
