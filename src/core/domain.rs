//! Domain names.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated, lowercase domain name without the trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Parse and normalize a domain name.
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            return Err(Error::invalid_value("Domain", name, "empty domain name"));
        }
        if trimmed.len() > MAX_DOMAIN_LENGTH {
            return Err(Error::invalid_value(
                "Domain",
                name,
                format!("longer than {} characters", MAX_DOMAIN_LENGTH),
            ));
        }

        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(Error::invalid_value("Domain", name, "empty label"));
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(Error::invalid_value(
                    "Domain",
                    name,
                    format!("label {} is longer than {} characters", label, MAX_LABEL_LENGTH),
                ));
            }
            if let Some(c) = label
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
            {
                return Err(Error::invalid_value(
                    "Domain",
                    name,
                    format!("unexpected character {:?}", c),
                ));
            }
        }

        Ok(Domain(trimmed.to_ascii_lowercase()))
    }

    /// Wrap a name that is already known to be a normalized domain.
    pub(crate) fn from_normalized(name: &str) -> Self {
        Domain(name.to_string())
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain itself followed by each parent domain up to the top level.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        let name = self.0.as_str();
        std::iter::once(name).chain(
            name.char_indices()
                .filter(|(_, c)| *c == '.')
                .map(move |(i, _)| &name[i + 1..]),
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Domain::new(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Domain::new(&s)
    }
}

impl From<Domain> for String {
    fn from(d: Domain) -> Self {
        d.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_normalization() {
        let d = Domain::new("WWW.Example.COM.").unwrap();
        assert_eq!(d.as_str(), "www.example.com");
    }

    #[test]
    fn test_domain_validation() {
        assert!(Domain::new("").is_err());
        assert!(Domain::new("a..b").is_err());
        assert!(Domain::new("exa mple.com").is_err());
        assert!(Domain::new(&"a".repeat(64)).is_err());
        assert!(Domain::new("_srv.example.com").is_ok());
    }

    #[test]
    fn test_domain_ancestors() {
        let d = Domain::new("www.example.com").unwrap();
        let ancestors: Vec<_> = d.ancestors().collect();
        assert_eq!(ancestors, vec!["www.example.com", "example.com", "com"]);
    }
}
