//! Rules.

use super::{Effect, Response, Target, TargetResult};
use crate::core::{AttributeAssignment, Context, Type};
use crate::expression::Expression;
use crate::{Error, Result};

use tracing::trace;

/// Leaf decision unit of a policy.
///
/// A rule applies when its target matches and its condition, if any, is
/// true. It then yields its effect together with its obligations.
#[derive(Debug, Clone)]
pub struct Rule {
    ord: usize,
    id: Option<String>,
    target: Target,
    condition: Option<Expression>,
    effect: Effect,
    obligations: Vec<AttributeAssignment>,
}

impl Rule {
    /// Create a rule with the given id and effect.
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            ord: 0,
            id: Some(id.into()),
            target: Target::Always,
            condition: None,
            effect,
            obligations: Vec::new(),
        }
    }

    /// Create a permit rule.
    pub fn permit(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Permit)
    }

    /// Create a deny rule.
    pub fn deny(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Deny)
    }

    /// Create a rule without id.
    pub fn hidden(effect: Effect) -> Self {
        Self {
            id: None,
            ..Self::new(String::new(), effect)
        }
    }

    /// Set the target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the condition.
    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add an obligation.
    pub fn with_obligation(mut self, obligation: AttributeAssignment) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Rule id, `None` for hidden rules.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Position within the parent policy.
    pub fn ord(&self) -> usize {
        self.ord
    }

    pub(crate) fn set_ord(&mut self, ord: usize) {
        self.ord = ord;
    }

    /// Rule effect.
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Rule target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Rule obligations.
    pub fn obligations(&self) -> &[AttributeAssignment] {
        &self.obligations
    }

    /// Validate the rule.
    pub fn validate(&self) -> Result<()> {
        if !self.effect.is_decisive() {
            return Err(Error::validation_field(
                format!("Rule effect must be Permit or Deny but is {}", self.effect),
                "effect",
            ));
        }

        if matches!(&self.id, Some(id) if id.is_empty()) {
            return Err(Error::validation_field("Rule ID cannot be empty", "id"));
        }

        self.target.validate()?;

        if let Some(condition) = &self.condition {
            if *condition.result_type() != Type::Boolean {
                return Err(Error::validation_field(
                    format!(
                        "Rule condition must be Boolean but is {}",
                        condition.result_type()
                    ),
                    "condition",
                ));
            }
        }

        Ok(())
    }

    fn bind(&self, e: Error) -> Error {
        match &self.id {
            Some(id) => e.bind(id.as_str()),
            None => e,
        }
    }

    /// Evaluate the rule.
    pub fn evaluate(&self, ctx: &Context) -> Response {
        let response = self.calculate(ctx);
        trace!(rule = ?self.id, effect = %response.effect, "Evaluated rule");
        response
    }

    fn calculate(&self, ctx: &Context) -> Response {
        match self.target.evaluate(ctx) {
            TargetResult::Match => {}
            TargetResult::NoMatch => return Response::not_applicable(),
            TargetResult::Indeterminate(e) => {
                return Response::not_applicable().with_status(self.bind(e));
            }
        }

        if let Some(condition) = &self.condition {
            match condition.calculate(ctx).and_then(|v| v.as_boolean()) {
                Ok(true) => {}
                Ok(false) => return Response::not_applicable(),
                Err(e) => return Response::indeterminate(self.effect, self.bind(e)),
            }
        }

        Response::new(self.effect).with_obligations(self.obligations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attribute, AttributeValue};
    use crate::expression::FunctionRegistry;

    fn is_admin() -> Expression {
        FunctionRegistry::builtin()
            .make(
                "equal",
                vec![
                    Expression::designator("role", Type::String),
                    AttributeValue::new_string("admin").into(),
                ],
            )
            .unwrap()
    }

    fn ctx(values: Vec<(&str, AttributeValue)>) -> Context {
        Context::from_values(None, values).unwrap()
    }

    #[test]
    fn test_permit_with_obligations() {
        let rule = Rule::permit("r").with_obligation(AttributeAssignment::new(
            Attribute::new("reason", Type::String),
            AttributeValue::new_string("ok"),
        ));

        let r = rule.evaluate(&Context::default());
        assert_eq!(r.effect, Effect::Permit);
        assert!(r.status.is_none());
        assert_eq!(r.obligations.len(), 1);
    }

    #[test]
    fn test_target_gates_rule() {
        let rule = Rule::deny("r").with_target(Target::matching(is_admin()));

        let r = rule.evaluate(&ctx(vec![("role", AttributeValue::new_string("admin"))]));
        assert_eq!(r.effect, Effect::Deny);

        let r = rule.evaluate(&ctx(vec![("role", AttributeValue::new_string("user"))]));
        assert_eq!(r.effect, Effect::NotApplicable);
        assert!(r.status.is_none());

        let r = rule.evaluate(&Context::default());
        assert_eq!(r.effect, Effect::NotApplicable);
        let status = r.status.unwrap();
        assert!(status.is_missing_value());
        assert!(status.to_string().starts_with("r>"));
    }

    #[test]
    fn test_condition() {
        let rule = Rule::permit("r").with_condition(is_admin());

        let r = rule.evaluate(&ctx(vec![("role", AttributeValue::new_string("user"))]));
        assert_eq!(r.effect, Effect::NotApplicable);

        let r = rule.evaluate(&Context::default());
        assert_eq!(r.effect, Effect::IndeterminateP);
        assert!(r.status.is_some());

        let r = Rule::deny("d").with_condition(is_admin()).evaluate(&Context::default());
        assert_eq!(r.effect, Effect::IndeterminateD);
    }

    #[test]
    fn test_hidden_rule_status_is_unbound() {
        let rule = Rule::hidden(Effect::Permit).with_condition(is_admin());
        let r = rule.evaluate(&Context::default());
        assert_eq!(r.status.unwrap().to_string(), "Missing attribute role (String)");
    }

    #[test]
    fn test_validate() {
        assert!(Rule::permit("r").validate().is_ok());
        assert!(Rule::new("r", Effect::NotApplicable).validate().is_err());
        assert!(Rule::permit("").validate().is_err());
        let rule = Rule::permit("r").with_condition(AttributeValue::new_string("x").into());
        assert!(rule.validate().is_err());
    }
}
