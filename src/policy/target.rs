//! Applicability predicates.

use crate::core::{Context, Type};
use crate::expression::Expression;
use crate::{Error, Result};

/// Outcome of matching a target against a context.
#[derive(Debug)]
pub enum TargetResult {
    /// The node applies
    Match,
    /// The node doesn't apply
    NoMatch,
    /// Matching failed
    Indeterminate(Error),
}

/// A predicate tree gating whether a rule, policy or policy set applies.
#[derive(Debug, Clone, Default)]
pub enum Target {
    /// Empty target, matches every request
    #[default]
    Always,
    /// Boolean expression
    Match(Expression),
    /// Matches if every nested target matches
    All(Vec<Target>),
    /// Matches if any nested target matches
    Any(Vec<Target>),
    /// Inverts a nested target
    Not(Box<Target>),
}

impl Target {
    /// Create a target from a boolean expression.
    pub fn matching(expression: Expression) -> Self {
        Target::Match(expression)
    }

    /// Create a conjunction of targets.
    pub fn all(targets: Vec<Target>) -> Self {
        Target::All(targets)
    }

    /// Create a disjunction of targets.
    pub fn any(targets: Vec<Target>) -> Self {
        Target::Any(targets)
    }

    /// Create a negated target.
    #[allow(clippy::should_implement_trait)]
    pub fn not(target: Target) -> Self {
        Target::Not(Box::new(target))
    }

    /// Check if the target is empty.
    pub fn is_always(&self) -> bool {
        matches!(self, Target::Always)
    }

    /// Validate that every match expression is boolean.
    pub fn validate(&self) -> Result<()> {
        match self {
            Target::Always => Ok(()),
            Target::Match(e) => {
                if *e.result_type() != Type::Boolean {
                    return Err(Error::validation_field(
                        format!("target expression must be Boolean but is {}", e.result_type()),
                        "target",
                    ));
                }
                Ok(())
            }
            Target::All(targets) | Target::Any(targets) => {
                targets.iter().try_for_each(Target::validate)
            }
            Target::Not(target) => target.validate(),
        }
    }

    /// Match the target against a context.
    ///
    /// `All` fails on the first no-match, otherwise reports the first
    /// error. `Any` succeeds on the first match, otherwise reports the first
    /// error. `Not` keeps errors as they are.
    pub fn evaluate(&self, ctx: &Context) -> TargetResult {
        match self {
            Target::Always => TargetResult::Match,
            Target::Match(e) => match e.calculate(ctx).and_then(|v| v.as_boolean()) {
                Ok(true) => TargetResult::Match,
                Ok(false) => TargetResult::NoMatch,
                Err(err) => TargetResult::Indeterminate(err),
            },
            Target::All(targets) => {
                let mut error = None;
                for target in targets {
                    match target.evaluate(ctx) {
                        TargetResult::Match => {}
                        TargetResult::NoMatch => return TargetResult::NoMatch,
                        TargetResult::Indeterminate(e) => {
                            error.get_or_insert(e);
                        }
                    }
                }
                error.map_or(TargetResult::Match, TargetResult::Indeterminate)
            }
            Target::Any(targets) => {
                let mut error = None;
                for target in targets {
                    match target.evaluate(ctx) {
                        TargetResult::Match => return TargetResult::Match,
                        TargetResult::NoMatch => {}
                        TargetResult::Indeterminate(e) => {
                            error.get_or_insert(e);
                        }
                    }
                }
                error.map_or(TargetResult::NoMatch, TargetResult::Indeterminate)
            }
            Target::Not(target) => match target.evaluate(ctx) {
                TargetResult::Match => TargetResult::NoMatch,
                TargetResult::NoMatch => TargetResult::Match,
                indeterminate => indeterminate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttributeValue;
    use crate::expression::FunctionRegistry;

    fn role_is(role: &str) -> Target {
        let e = FunctionRegistry::builtin()
            .make(
                "equal",
                vec![
                    Expression::designator("role", Type::String),
                    AttributeValue::new_string(role).into(),
                ],
            )
            .unwrap();
        Target::matching(e)
    }

    fn ctx(role: Option<&str>) -> Context {
        let values: Vec<(&str, AttributeValue)> = role
            .map(|r| vec![("role", AttributeValue::new_string(r))])
            .unwrap_or_default();
        Context::from_values(None, values).unwrap()
    }

    fn outcome(t: &Target, c: &Context) -> &'static str {
        match t.evaluate(c) {
            TargetResult::Match => "match",
            TargetResult::NoMatch => "no-match",
            TargetResult::Indeterminate(_) => "indeterminate",
        }
    }

    #[test]
    fn test_empty_target_matches() {
        assert_eq!(outcome(&Target::Always, &Context::default()), "match");
    }

    #[test]
    fn test_match_expression() {
        let t = role_is("admin");
        assert_eq!(outcome(&t, &ctx(Some("admin"))), "match");
        assert_eq!(outcome(&t, &ctx(Some("user"))), "no-match");
        assert_eq!(outcome(&t, &ctx(None)), "indeterminate");
    }

    #[test]
    fn test_combinators() {
        let any = Target::any(vec![role_is("admin"), role_is("user")]);
        assert_eq!(outcome(&any, &ctx(Some("user"))), "match");
        assert_eq!(outcome(&any, &ctx(Some("guest"))), "no-match");
        assert_eq!(outcome(&any, &ctx(None)), "indeterminate");

        let all = Target::all(vec![role_is("admin"), Target::not(role_is("user"))]);
        assert_eq!(outcome(&all, &ctx(Some("admin"))), "match");
        assert_eq!(outcome(&all, &ctx(Some("user"))), "no-match");

        let not = Target::not(role_is("admin"));
        assert_eq!(outcome(&not, &ctx(None)), "indeterminate");
    }

    #[test]
    fn test_all_prefers_no_match_over_error() {
        let broken = Target::matching(Expression::designator("flag", Type::Boolean));
        let all = Target::all(vec![broken.clone(), role_is("admin")]);
        assert_eq!(outcome(&all, &ctx(Some("user"))), "no-match");

        let any = Target::any(vec![broken, role_is("admin")]);
        assert_eq!(outcome(&any, &ctx(Some("admin"))), "match");
    }

    #[test]
    fn test_validate() {
        assert!(role_is("x").validate().is_ok());
        let t = Target::all(vec![Target::matching(AttributeValue::new_integer(1).into())]);
        assert!(t.validate().is_err());
    }
}
