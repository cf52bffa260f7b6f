//! Policy decision types.

use crate::core::{Context, SerializedAssignment};
use crate::policy::{DecisionType, Response};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The result of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The type of decision
    pub decision: DecisionType,
    /// Errors met during evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Obligations of the decisive branch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<SerializedAssignment>,
    /// Time taken for evaluation in milliseconds
    pub evaluation_time_ms: f64,
}

impl PolicyDecision {
    /// Build a decision from an evaluation response.
    ///
    /// Obligations are calculated against the request context. If one of
    /// them fails the decision becomes Indeterminate.
    pub fn from_response(response: Response, ctx: &Context) -> Self {
        let obligations = match serialize_obligations(&response, ctx) {
            Ok(obligations) => obligations,
            Err(e) => {
                let status = match response.status {
                    Some(status) => Error::Multiple(vec![status, e]),
                    None => e,
                };
                return Self::indeterminate(status);
            }
        };

        Self {
            decision: response.effect.decision(),
            status: response.status.map(|e| e.to_string()),
            obligations,
            evaluation_time_ms: 0.0,
        }
    }

    /// Indeterminate decision carrying an error.
    pub fn indeterminate(error: Error) -> Self {
        Self {
            decision: DecisionType::Indeterminate,
            status: Some(error.to_string()),
            obligations: Vec::new(),
            evaluation_time_ms: 0.0,
        }
    }

    /// Set the evaluation time.
    pub fn with_evaluation_time(mut self, duration: Duration) -> Self {
        self.evaluation_time_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Check if this decision allows the request.
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

fn serialize_obligations(response: &Response, ctx: &Context) -> Result<Vec<SerializedAssignment>> {
    response
        .obligations
        .iter()
        .map(|o| o.serialize(ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attribute, AttributeAssignment, AttributeValue, Type};
    use crate::expression::Expression;
    use crate::policy::Effect;

    fn obligation(id: &str, value: &str) -> AttributeAssignment {
        AttributeAssignment::new(
            Attribute::new(id, Type::String),
            AttributeValue::new_string(value),
        )
    }

    #[test]
    fn test_from_response() {
        let response = Response::new(Effect::Permit).with_obligations(vec![obligation("log", "on")]);
        let decision = PolicyDecision::from_response(response, &Context::default());

        assert!(decision.is_allowed());
        assert!(decision.status.is_none());
        assert_eq!(decision.obligations.len(), 1);
        assert_eq!(decision.obligations[0].id, "log");
        assert_eq!(decision.obligations[0].type_key, "string");
        assert_eq!(decision.obligations[0].value, "on");
    }

    #[test]
    fn test_extended_indeterminate_collapses() {
        let response = Response::indeterminate(Effect::Deny, Error::missing_value("x"));
        let decision = PolicyDecision::from_response(response, &Context::default());

        assert_eq!(decision.decision, DecisionType::Indeterminate);
        assert!(decision.status.is_some());
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_failed_obligation() {
        let broken = AttributeAssignment::new(
            Attribute::new("user", Type::String),
            Expression::designator("user", Type::String),
        );
        let response = Response::new(Effect::Permit).with_obligations(vec![broken]);
        let decision = PolicyDecision::from_response(response, &Context::default());

        assert_eq!(decision.decision, DecisionType::Indeterminate);
        assert!(decision.obligations.is_empty());
    }

    #[test]
    fn test_decision_serialization() {
        let response = Response::new(Effect::Deny).with_obligations(vec![obligation("reason", "x")]);
        let decision = PolicyDecision::from_response(response, &Context::default())
            .with_evaluation_time(Duration::from_millis(2));

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["obligations"][0]["type"], "string");
        assert!(json.get("status").is_none());

        let parsed: PolicyDecision = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.decision, DecisionType::Deny);
        assert_eq!(parsed.evaluation_time_ms, 2.0);
    }
}
