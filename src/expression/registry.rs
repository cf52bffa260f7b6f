//! Function registry and overload resolution.

use super::{functions, Expression};
use crate::core::Type;
use crate::{Error, Result};

use std::collections::HashMap;
use std::fmt;

/// Builds a function expression from arguments accepted by a validator.
pub type FunctionMaker = fn(Vec<Expression>) -> Result<Expression>;

/// Inspects static argument types and returns a maker if it accepts them.
pub type Validator = fn(&[Type]) -> Option<FunctionMaker>;

/// Registry of named functions.
///
/// Each name maps to an ordered list of validators. When a call is built
/// the validators are tried in registration order and the first one that
/// accepts the argument types supplies the function.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<Validator>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every builtin function.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, validator) in functions::builtin_validators() {
            registry.register(name, validator);
        }
        registry
    }

    /// Append a validator to the overloads of `name`.
    pub fn register(&mut self, name: impl Into<String>, validator: Validator) {
        self.functions.entry(name.into()).or_default().push(validator);
    }

    /// Check if a function is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a call of `name` with the given arguments.
    pub fn make(&self, name: &str, args: Vec<Expression>) -> Result<Expression> {
        let validators = self.functions.get(name).ok_or_else(|| Error::UnknownFunction {
            name: name.to_string(),
        })?;

        let types: Vec<Type> = args.iter().map(|a| a.result_type().clone()).collect();
        for validator in validators {
            if let Some(maker) = validator(&types) {
                return maker(args);
            }
        }

        Err(Error::function_arguments(
            name,
            format!(
                "no overload accepts ({})",
                types
                    .iter()
                    .map(Type::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ))
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeValue, Context};

    fn int(v: i64) -> Expression {
        AttributeValue::new_integer(v).into()
    }

    fn float(v: f64) -> Expression {
        AttributeValue::new_float(v).into()
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::builtin();
        assert!(matches!(
            registry.make("nope", vec![]),
            Err(Error::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_first_validator_wins() {
        let registry = FunctionRegistry::builtin();

        let e = registry.make("add", vec![int(1), int(2)]).unwrap();
        assert_eq!(e.result_type(), &Type::Integer);
        assert_eq!(e.calculate(&Context::default()).unwrap().as_integer().unwrap(), 3);

        let e = registry.make("add", vec![int(1), float(0.5)]).unwrap();
        assert_eq!(e.result_type(), &Type::Float);
        assert_eq!(e.calculate(&Context::default()).unwrap().as_float().unwrap(), 1.5);
    }

    #[test]
    fn test_registration_order_is_priority() {
        fn reject(_: &[Type]) -> Option<FunctionMaker> {
            None
        }
        fn constant(_: &[Type]) -> Option<FunctionMaker> {
            Some(|_| Ok(AttributeValue::new_string("first").into()))
        }
        fn other(_: &[Type]) -> Option<FunctionMaker> {
            Some(|_| Ok(AttributeValue::new_string("second").into()))
        }

        let mut registry = FunctionRegistry::new();
        registry.register("pick", reject);
        registry.register("pick", constant);
        registry.register("pick", other);

        let e = registry.make("pick", vec![]).unwrap();
        assert_eq!(
            e.calculate(&Context::default()).unwrap().as_str().unwrap(),
            "first"
        );
    }

    #[test]
    fn test_no_matching_overload() {
        let registry = FunctionRegistry::builtin();
        let err = registry
            .make("add", vec![AttributeValue::new_string("a").into(), int(1)])
            .unwrap_err();
        assert!(matches!(err, Error::FunctionArguments { .. }));
        assert!(err.to_string().contains("(String, Integer)"));
    }

    #[test]
    fn test_builtin_names() {
        let registry = FunctionRegistry::builtin();
        for name in ["concat", "try", "list of strings", "divide", "range", "contains"] {
            assert!(registry.contains(name), "{} is missing", name);
        }
    }
}
