//! Conversions between host values and attribute values.

use super::{AttributeValue, Domain, StringSet, Type};
use crate::Result;

use ipnet::IpNet;
use std::net::IpAddr;

/// A host value that can be turned into an attribute value.
pub trait AsAttribute {
    /// Attribute type produced by the conversion.
    fn attribute_type(&self) -> Type;

    /// Convert to an attribute value.
    fn as_attribute(&self) -> AttributeValue;
}

/// A host value that can be read back from an attribute value.
pub trait FromAttribute: Sized {
    /// Convert from an attribute value, failing on a type mismatch.
    fn from_attribute(value: &AttributeValue) -> Result<Self>;
}

macro_rules! scalar_adapter {
    ($host:ty, $t:expr, $new:expr, $get:expr) => {
        impl AsAttribute for $host {
            fn attribute_type(&self) -> Type {
                $t
            }

            fn as_attribute(&self) -> AttributeValue {
                $new(self.clone())
            }
        }

        impl FromAttribute for $host {
            fn from_attribute(value: &AttributeValue) -> Result<Self> {
                $get(value)
            }
        }
    };
}

scalar_adapter!(bool, Type::Boolean, AttributeValue::new_boolean, |v: &AttributeValue| v
    .as_boolean());
scalar_adapter!(i64, Type::Integer, AttributeValue::new_integer, |v: &AttributeValue| v
    .as_integer());
scalar_adapter!(f64, Type::Float, AttributeValue::new_float, |v: &AttributeValue| v
    .as_float());
scalar_adapter!(IpAddr, Type::Address, AttributeValue::new_address, |v: &AttributeValue| v
    .as_address());
scalar_adapter!(IpNet, Type::Network, AttributeValue::new_network, |v: &AttributeValue| v
    .as_network());
scalar_adapter!(Domain, Type::Domain, AttributeValue::new_domain, |v: &AttributeValue| v
    .as_domain()
    .cloned());
scalar_adapter!(String, Type::String, AttributeValue::new_string, |v: &AttributeValue| v
    .as_str()
    .map(str::to_string));
scalar_adapter!(
    Vec<String>,
    Type::ListOfStrings,
    AttributeValue::new_list_of_strings,
    |v: &AttributeValue| v.as_list_of_strings().map(<[String]>::to_vec)
);
scalar_adapter!(
    StringSet,
    Type::SetOfStrings,
    AttributeValue::new_set_of_strings,
    |v: &AttributeValue| v.as_set_of_strings().cloned()
);

impl AsAttribute for &str {
    fn attribute_type(&self) -> Type {
        Type::String
    }

    fn as_attribute(&self) -> AttributeValue {
        AttributeValue::new_string(*self)
    }
}

impl AsAttribute for AttributeValue {
    fn attribute_type(&self) -> Type {
        self.get_type().clone()
    }

    fn as_attribute(&self) -> AttributeValue {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: AsAttribute + FromAttribute + PartialEq + std::fmt::Debug>(v: T) {
        let attr = v.as_attribute();
        assert_eq!(attr.get_type(), &v.attribute_type());
        assert_eq!(T::from_attribute(&attr).unwrap(), v);
    }

    #[test]
    fn test_host_round_trips() {
        round_trip(true);
        round_trip(42i64);
        round_trip(0.25f64);
        round_trip("198.51.100.7".parse::<IpAddr>().unwrap());
        round_trip("2001:db8::/32".parse::<IpNet>().unwrap());
        round_trip(Domain::new("example.org").unwrap());
        round_trip("text".to_string());
        round_trip(vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_from_attribute_type_error() {
        let v = "x".as_attribute();
        assert!(i64::from_attribute(&v).is_err());
        assert_eq!(String::from_attribute(&v).unwrap(), "x");
    }
}
