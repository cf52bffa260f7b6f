//! Typed attribute values.

use super::{Domain, DomainSet, FlagsType, NetworkSet, StringSet, Type};
use crate::{Error, Result};

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Undefined,
    Boolean(bool),
    String(Arc<str>),
    Integer(i64),
    Float(f64),
    Address(IpAddr),
    Network(IpNet),
    Domain(Domain),
    SetOfStrings(Arc<StringSet>),
    SetOfNetworks(Arc<NetworkSet>),
    SetOfDomains(Arc<DomainSet>),
    ListOfStrings(Arc<[String]>),
    Flags8(u8),
    Flags16(u16),
    Flags32(u32),
    Flags64(u64),
}

/// An immutable value tagged with its type.
///
/// The payload shape is fixed by the type: values are created only through
/// the `new_*` constructors (or [`AttributeValue::parse`]) and read through
/// the `as_*` accessors, which report a type error instead of returning a
/// payload of another kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    t: Type,
    v: Payload,
}

/// The unique value of type Undefined.
pub const UNDEFINED_VALUE: AttributeValue = AttributeValue {
    t: Type::Undefined,
    v: Payload::Undefined,
};

impl AttributeValue {
    /// Create a boolean value.
    pub fn new_boolean(v: bool) -> Self {
        Self {
            t: Type::Boolean,
            v: Payload::Boolean(v),
        }
    }

    /// Create a string value.
    pub fn new_string(v: impl Into<String>) -> Self {
        Self {
            t: Type::String,
            v: Payload::String(Arc::from(v.into())),
        }
    }

    /// Create an integer value.
    pub fn new_integer(v: i64) -> Self {
        Self {
            t: Type::Integer,
            v: Payload::Integer(v),
        }
    }

    /// Create a float value.
    pub fn new_float(v: f64) -> Self {
        Self {
            t: Type::Float,
            v: Payload::Float(v),
        }
    }

    /// Create an address value.
    pub fn new_address(v: IpAddr) -> Self {
        Self {
            t: Type::Address,
            v: Payload::Address(v),
        }
    }

    /// Create a network value; host bits are cleared.
    pub fn new_network(v: IpNet) -> Self {
        Self {
            t: Type::Network,
            v: Payload::Network(v.trunc()),
        }
    }

    /// Create a domain value.
    pub fn new_domain(v: Domain) -> Self {
        Self {
            t: Type::Domain,
            v: Payload::Domain(v),
        }
    }

    /// Create a set of strings value.
    pub fn new_set_of_strings(v: StringSet) -> Self {
        Self {
            t: Type::SetOfStrings,
            v: Payload::SetOfStrings(Arc::new(v)),
        }
    }

    /// Create a set of networks value.
    pub fn new_set_of_networks(v: NetworkSet) -> Self {
        Self {
            t: Type::SetOfNetworks,
            v: Payload::SetOfNetworks(Arc::new(v)),
        }
    }

    /// Create a set of domains value.
    pub fn new_set_of_domains(v: DomainSet) -> Self {
        Self {
            t: Type::SetOfDomains,
            v: Payload::SetOfDomains(Arc::new(v)),
        }
    }

    /// Create a list of strings value.
    pub fn new_list_of_strings(v: Vec<String>) -> Self {
        Self {
            t: Type::ListOfStrings,
            v: Payload::ListOfStrings(Arc::from(v)),
        }
    }

    /// Create an 8-bit flags value.
    pub fn new_flags8(mask: u8, t: &Type) -> Result<Self> {
        let _ = flags_type_of(t, 8, mask as u64)?;
        Ok(Self {
            t: t.clone(),
            v: Payload::Flags8(mask),
        })
    }

    /// Create a 16-bit flags value.
    pub fn new_flags16(mask: u16, t: &Type) -> Result<Self> {
        let _ = flags_type_of(t, 16, mask as u64)?;
        Ok(Self {
            t: t.clone(),
            v: Payload::Flags16(mask),
        })
    }

    /// Create a 32-bit flags value.
    pub fn new_flags32(mask: u32, t: &Type) -> Result<Self> {
        let _ = flags_type_of(t, 32, mask as u64)?;
        Ok(Self {
            t: t.clone(),
            v: Payload::Flags32(mask),
        })
    }

    /// Create a 64-bit flags value.
    pub fn new_flags64(mask: u64, t: &Type) -> Result<Self> {
        let _ = flags_type_of(t, 64, mask)?;
        Ok(Self {
            t: t.clone(),
            v: Payload::Flags64(mask),
        })
    }

    /// Create a flags value picking the container width from the type.
    pub fn new_flags(mask: u64, t: &Type) -> Result<Self> {
        let ft = t
            .as_flags()
            .ok_or_else(|| Error::AttributeValueFlagsType {
                actual: t.name().to_string(),
            })?;
        if mask & !ft.mask() != 0 {
            return Err(Error::invalid_value(
                ft.name(),
                format!("{:#x}", mask),
                format!("only {} flags are defined", ft.len()),
            ));
        }
        // The check above guarantees the narrowing casts keep every bit.
        match ft.bits() {
            8 => Self::new_flags8(mask as u8, t),
            16 => Self::new_flags16(mask as u16, t),
            32 => Self::new_flags32(mask as u32, t),
            _ => Self::new_flags64(mask, t),
        }
    }

    /// Type of the value.
    pub fn get_type(&self) -> &Type {
        &self.t
    }

    /// Check if this is the undefined value.
    pub fn is_undefined(&self) -> bool {
        matches!(self.v, Payload::Undefined)
    }

    fn type_error(&self, expected: &Type) -> Error {
        Error::value_type(expected.name(), self.t.name())
    }

    /// Boolean payload.
    pub fn as_boolean(&self) -> Result<bool> {
        match self.v {
            Payload::Boolean(v) => Ok(v),
            _ => Err(self.type_error(&Type::Boolean)),
        }
    }

    /// String payload.
    pub fn as_str(&self) -> Result<&str> {
        match &self.v {
            Payload::String(v) => Ok(v),
            _ => Err(self.type_error(&Type::String)),
        }
    }

    /// Integer payload.
    pub fn as_integer(&self) -> Result<i64> {
        match self.v {
            Payload::Integer(v) => Ok(v),
            _ => Err(self.type_error(&Type::Integer)),
        }
    }

    /// Float payload.
    pub fn as_float(&self) -> Result<f64> {
        match self.v {
            Payload::Float(v) => Ok(v),
            _ => Err(self.type_error(&Type::Float)),
        }
    }

    /// Address payload.
    pub fn as_address(&self) -> Result<IpAddr> {
        match self.v {
            Payload::Address(v) => Ok(v),
            _ => Err(self.type_error(&Type::Address)),
        }
    }

    /// Network payload.
    pub fn as_network(&self) -> Result<IpNet> {
        match self.v {
            Payload::Network(v) => Ok(v),
            _ => Err(self.type_error(&Type::Network)),
        }
    }

    /// Domain payload.
    pub fn as_domain(&self) -> Result<&Domain> {
        match &self.v {
            Payload::Domain(v) => Ok(v),
            _ => Err(self.type_error(&Type::Domain)),
        }
    }

    /// Set of strings payload.
    pub fn as_set_of_strings(&self) -> Result<&StringSet> {
        match &self.v {
            Payload::SetOfStrings(v) => Ok(v),
            _ => Err(self.type_error(&Type::SetOfStrings)),
        }
    }

    /// Set of networks payload.
    pub fn as_set_of_networks(&self) -> Result<&NetworkSet> {
        match &self.v {
            Payload::SetOfNetworks(v) => Ok(v),
            _ => Err(self.type_error(&Type::SetOfNetworks)),
        }
    }

    /// Set of domains payload.
    pub fn as_set_of_domains(&self) -> Result<&DomainSet> {
        match &self.v {
            Payload::SetOfDomains(v) => Ok(v),
            _ => Err(self.type_error(&Type::SetOfDomains)),
        }
    }

    /// List of strings payload.
    pub fn as_list_of_strings(&self) -> Result<&[String]> {
        match &self.v {
            Payload::ListOfStrings(v) => Ok(v),
            _ => Err(self.type_error(&Type::ListOfStrings)),
        }
    }

    /// 8-bit flags payload.
    pub fn as_flags8(&self) -> Result<u8> {
        match self.v {
            Payload::Flags8(v) => Ok(v),
            _ => Err(self.flags_error(8)),
        }
    }

    /// 16-bit flags payload.
    pub fn as_flags16(&self) -> Result<u16> {
        match self.v {
            Payload::Flags16(v) => Ok(v),
            _ => Err(self.flags_error(16)),
        }
    }

    /// 32-bit flags payload.
    pub fn as_flags32(&self) -> Result<u32> {
        match self.v {
            Payload::Flags32(v) => Ok(v),
            _ => Err(self.flags_error(32)),
        }
    }

    /// 64-bit flags payload.
    pub fn as_flags64(&self) -> Result<u64> {
        match self.v {
            Payload::Flags64(v) => Ok(v),
            _ => Err(self.flags_error(64)),
        }
    }

    /// Flags payload of any width widened to 64 bits.
    pub fn as_flags_mask(&self) -> Result<u64> {
        match self.v {
            Payload::Flags8(v) => Ok(v as u64),
            Payload::Flags16(v) => Ok(v as u64),
            Payload::Flags32(v) => Ok(v as u64),
            Payload::Flags64(v) => Ok(v),
            _ => Err(Error::AttributeValueFlagsType {
                actual: self.t.name().to_string(),
            }),
        }
    }

    fn flags_error(&self, requested: u32) -> Error {
        match &self.t {
            Type::Flags(ft) => Error::AttributeValueFlagsBits {
                flags_type: ft.name().to_string(),
                requested,
                actual: ft.bits(),
            },
            other => Error::AttributeValueFlagsType {
                actual: other.name().to_string(),
            },
        }
    }

    /// Canonical string form of the value.
    pub fn serialize(&self) -> Result<String> {
        Ok(match &self.v {
            Payload::Undefined => return Err(Error::UndefinedSerialization),
            Payload::Boolean(v) => v.to_string(),
            Payload::String(v) => v.to_string(),
            Payload::Integer(v) => v.to_string(),
            Payload::Float(v) => v.to_string(),
            Payload::Address(v) => v.to_string(),
            Payload::Network(v) => v.to_string(),
            Payload::Domain(v) => v.to_string(),
            Payload::SetOfStrings(v) => quote_all(v.iter_ranked().map(String::as_str)),
            Payload::SetOfNetworks(v) => quote_all(v.iter().map(|n| n.to_string())),
            Payload::SetOfDomains(v) => quote_all(v.iter_ranked().map(Domain::as_str)),
            Payload::ListOfStrings(v) => quote_all(v.iter().map(String::as_str)),
            Payload::Flags8(_) | Payload::Flags16(_) | Payload::Flags32(_) | Payload::Flags64(_) => {
                let mask = self.as_flags_mask()?;
                match &self.t {
                    Type::Flags(ft) => quote_all(ft.names(mask)),
                    other => return Err(Error::internal(format!("flags payload of {}", other))),
                }
            }
        })
    }

    /// Parse the canonical string form of a value of the given type.
    pub fn parse(t: &Type, text: &str) -> Result<Self> {
        let invalid = |message: String| Error::invalid_value(t.name(), text, message);

        match t {
            Type::Undefined => Err(invalid("undefined value has no string form".to_string())),
            Type::Boolean => text
                .parse::<bool>()
                .map(Self::new_boolean)
                .map_err(|e| invalid(e.to_string())),
            Type::String => Ok(Self::new_string(text)),
            Type::Integer => text
                .parse::<i64>()
                .map(Self::new_integer)
                .map_err(|e| invalid(e.to_string())),
            Type::Float => text
                .parse::<f64>()
                .map(Self::new_float)
                .map_err(|e| invalid(e.to_string())),
            Type::Address => text
                .parse::<IpAddr>()
                .map(Self::new_address)
                .map_err(|e| invalid(e.to_string())),
            Type::Network => parse_network(text)
                .map(Self::new_network)
                .map_err(invalid),
            Type::Domain => Domain::new(text).map(Self::new_domain),
            Type::SetOfStrings => Ok(Self::new_set_of_strings(
                unquote_all(text).map_err(invalid)?.into_iter().collect(),
            )),
            Type::SetOfNetworks => {
                let mut set = NetworkSet::new();
                for item in unquote_all(text).map_err(invalid)? {
                    set.insert(parse_network(&item).map_err(invalid)?);
                }
                Ok(Self::new_set_of_networks(set))
            }
            Type::SetOfDomains => {
                let mut set = DomainSet::new();
                for item in unquote_all(text).map_err(invalid)? {
                    set.insert(Domain::new(&item)?);
                }
                Ok(Self::new_set_of_domains(set))
            }
            Type::ListOfStrings => Ok(Self::new_list_of_strings(
                unquote_all(text).map_err(invalid)?,
            )),
            Type::Flags(ft) => {
                let mut mask = 0u64;
                for name in unquote_all(text).map_err(invalid)? {
                    let i = ft.index_of(&name).ok_or_else(|| Error::UnknownFlag {
                        flags_type: ft.name().to_string(),
                        flag: name.clone(),
                    })?;
                    mask |= 1u64 << i;
                }
                Self::new_flags(mask, t)
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.serialize() {
            Ok(s) => write!(f, "{}({})", self.t.name(), s),
            Err(_) => write!(f, "{}", self.t.name()),
        }
    }
}

fn flags_type_of(t: &Type, requested: u32, mask: u64) -> Result<&FlagsType> {
    let ft = t.as_flags().ok_or_else(|| Error::AttributeValueFlagsType {
        actual: t.name().to_string(),
    })?;
    if ft.bits() != requested {
        return Err(Error::AttributeValueFlagsBits {
            flags_type: ft.name().to_string(),
            requested,
            actual: ft.bits(),
        });
    }
    if mask & !ft.mask() != 0 {
        return Err(Error::invalid_value(
            ft.name(),
            format!("{:#x}", mask),
            format!("only {} flags are defined", ft.len()),
        ));
    }
    Ok(ft)
}

fn parse_network(text: &str) -> std::result::Result<IpNet, String> {
    text.parse::<IpNet>().map_err(|e| e.to_string())
}

/// Join strings as a comma-separated sequence of JSON-quoted strings.
fn quote_all<S: AsRef<str>>(items: impl Iterator<Item = S>) -> String {
    items
        .map(|s| serde_json::Value::String(s.as_ref().to_string()).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`quote_all`].
fn unquote_all(text: &str) -> std::result::Result<Vec<String>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<String>>(&format!("[{}]", text)).map_err(|e| e.to_string())
}
