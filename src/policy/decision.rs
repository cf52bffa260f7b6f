//! Decision and effect types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The decision reported to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    /// Allow the request to proceed
    Permit,
    /// Deny the request
    Deny,
    /// No policy applies to the request
    NotApplicable,
    /// Evaluation could not complete
    Indeterminate,
}

impl DecisionType {
    /// Check if this decision allows the request.
    pub fn is_allowed(&self) -> bool {
        matches!(self, DecisionType::Permit)
    }

    /// Check if this decision denies the request.
    pub fn is_denied(&self) -> bool {
        matches!(self, DecisionType::Deny)
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Permit => "permit",
            DecisionType::Deny => "deny",
            DecisionType::NotApplicable => "notapplicable",
            DecisionType::Indeterminate => "indeterminate",
        }
    }
}

impl Default for DecisionType {
    fn default() -> Self {
        DecisionType::NotApplicable
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DecisionType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permit" => Ok(DecisionType::Permit),
            "deny" => Ok(DecisionType::Deny),
            "notapplicable" | "not_applicable" => Ok(DecisionType::NotApplicable),
            "indeterminate" => Ok(DecisionType::Indeterminate),
            _ => Err(crate::Error::validation(format!("Unknown decision type: {}", s))),
        }
    }
}

/// Effect of a rule or of a combined subtree.
///
/// The extended indeterminate effects record which decisive effect the
/// failed branch could have produced. Plain `Indeterminate` means either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Deny
    Deny,
    /// Permit
    Permit,
    /// Not applicable
    NotApplicable,
    /// Indeterminate, could have been Deny or Permit
    Indeterminate,
    /// Indeterminate, could have been Deny
    IndeterminateD,
    /// Indeterminate, could have been Permit
    IndeterminateP,
}

impl Effect {
    /// Collapse to the external decision.
    pub fn decision(self) -> DecisionType {
        match self {
            Effect::Deny => DecisionType::Deny,
            Effect::Permit => DecisionType::Permit,
            Effect::NotApplicable => DecisionType::NotApplicable,
            Effect::Indeterminate | Effect::IndeterminateD | Effect::IndeterminateP => {
                DecisionType::Indeterminate
            }
        }
    }

    /// Check if the effect is Permit or Deny.
    pub fn is_decisive(self) -> bool {
        matches!(self, Effect::Deny | Effect::Permit)
    }

    /// Check if the effect is any of the indeterminate ones.
    pub fn is_indeterminate(self) -> bool {
        matches!(
            self,
            Effect::Indeterminate | Effect::IndeterminateD | Effect::IndeterminateP
        )
    }

    /// Indeterminate effect of a failed branch that would have produced
    /// this effect.
    pub fn as_indeterminate(self) -> Effect {
        match self {
            Effect::Deny => Effect::IndeterminateD,
            Effect::Permit => Effect::IndeterminateP,
            other if other.is_indeterminate() => other,
            _ => Effect::Indeterminate,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Effect::Deny => "Deny",
            Effect::Permit => "Permit",
            Effect::NotApplicable => "NotApplicable",
            Effect::Indeterminate => "Indeterminate",
            Effect::IndeterminateD => "Indeterminate{D}",
            Effect::IndeterminateP => "Indeterminate{P}",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_is_allowed() {
        assert!(DecisionType::Permit.is_allowed());
        assert!(!DecisionType::Deny.is_allowed());
        assert!(!DecisionType::NotApplicable.is_allowed());
        assert!(!DecisionType::Indeterminate.is_allowed());
    }

    #[test]
    fn test_decision_from_str() {
        assert_eq!("permit".parse::<DecisionType>().unwrap(), DecisionType::Permit);
        assert_eq!("DENY".parse::<DecisionType>().unwrap(), DecisionType::Deny);
        assert_eq!(
            "NotApplicable".parse::<DecisionType>().unwrap(),
            DecisionType::NotApplicable
        );
        assert!("invalid".parse::<DecisionType>().is_err());
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&DecisionType::Indeterminate).unwrap();
        assert_eq!(json, "\"indeterminate\"");

        let parsed: DecisionType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DecisionType::Indeterminate);
    }

    #[test]
    fn test_effect_collapse() {
        assert_eq!(Effect::IndeterminateD.decision(), DecisionType::Indeterminate);
        assert_eq!(Effect::IndeterminateP.decision(), DecisionType::Indeterminate);
        assert_eq!(Effect::Permit.as_indeterminate(), Effect::IndeterminateP);
        assert_eq!(Effect::Deny.as_indeterminate(), Effect::IndeterminateD);
        assert_eq!(Effect::NotApplicable.as_indeterminate(), Effect::Indeterminate);
    }
}
