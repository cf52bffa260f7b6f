//! Builtin functions.

mod collections;
mod comparison;
mod control;
mod logic;
mod numeric;
mod strings;

use super::{Expression, FunctionMaker, Validator};
use crate::core::{AttributeValue, Context, Type};
use crate::{Error, Result};

use std::sync::Arc;

pub(crate) use collections::CollectionOp;
pub(crate) use comparison::CompareOp;
pub(crate) use logic::LogicOp;
pub(crate) use numeric::{ArithmeticOp, Numeric};

/// Builds a validator accepting exactly the listed argument types.
macro_rules! overload {
    ([$($t:pat),*] => $make:expr) => {
        (|types: &[Type]| -> Option<FunctionMaker> {
            match types {
                [$($t),*] => Some($make as FunctionMaker),
                _ => None,
            }
        }) as Validator
    };
}
pub(super) use overload;

/// Builds a validator from a predicate over the argument types.
macro_rules! validator {
    (|$types:ident| $accept:expr => $make:expr) => {
        (|$types: &[Type]| -> Option<FunctionMaker> {
            if $accept {
                Some($make as FunctionMaker)
            } else {
                None
            }
        }) as Validator
    };
}
pub(super) use validator;

/// Implementation selected by a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Logic(LogicOp),
    Compare(CompareOp),
    Arithmetic(ArithmeticOp, Numeric),
    Range(Numeric),
    ToFloat,
    Collection(CollectionOp),
    Concat,
    ListOfStrings,
    Try,
}

/// A call of a builtin function.
#[derive(Debug, Clone)]
pub struct Function {
    name: &'static str,
    kind: FunctionKind,
    result_type: Type,
    args: Arc<[Expression]>,
}

impl Function {
    pub(crate) fn expression(
        name: &'static str,
        kind: FunctionKind,
        result_type: Type,
        args: Vec<Expression>,
    ) -> Result<Expression> {
        Ok(Expression::Function(Self {
            name,
            kind,
            result_type,
            args: args.into(),
        }))
    }

    /// Function name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Result type of the call.
    pub fn result_type(&self) -> &Type {
        &self.result_type
    }

    /// Call arguments.
    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    /// Evaluate the call.
    pub fn calculate(&self, ctx: &Context) -> Result<AttributeValue> {
        let args = &self.args;
        match self.kind {
            FunctionKind::Logic(op) => logic::calculate(op, args, ctx),
            FunctionKind::Compare(op) => comparison::calculate(op, args, ctx),
            FunctionKind::Arithmetic(op, n) => numeric::arithmetic(op, n, args, ctx),
            FunctionKind::Range(n) => numeric::range(n, args, ctx),
            FunctionKind::ToFloat => numeric::to_float(args, ctx),
            FunctionKind::Collection(op) => collections::calculate(op, args, ctx),
            FunctionKind::Concat => strings::concat(args, ctx),
            FunctionKind::ListOfStrings => strings::list_of_strings(args, ctx),
            FunctionKind::Try => control::first_success(args, ctx),
        }
    }
}

/// Every builtin validator with the name it is registered under.
pub(super) fn builtin_validators() -> Vec<(&'static str, Validator)> {
    let mut validators = Vec::new();
    validators.extend(logic::validators());
    validators.extend(comparison::validators());
    validators.extend(numeric::validators());
    validators.extend(collections::validators());
    validators.extend(strings::validators());
    validators.extend(control::validators());
    validators
}

fn arity(name: &str, expected: usize, actual: usize) -> Error {
    Error::internal(format!(
        "{} expects {} arguments but has {}",
        name, expected, actual
    ))
}

pub(super) fn unary<'a>(name: &str, args: &'a [Expression]) -> Result<&'a Expression> {
    match args {
        [a] => Ok(a),
        _ => Err(arity(name, 1, args.len())),
    }
}

pub(super) fn binary<'a>(
    name: &str,
    args: &'a [Expression],
) -> Result<(&'a Expression, &'a Expression)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(arity(name, 2, args.len())),
    }
}

pub(super) fn ternary<'a>(
    name: &str,
    args: &'a [Expression],
) -> Result<(&'a Expression, &'a Expression, &'a Expression)> {
    match args {
        [a, b, c] => Ok((a, b, c)),
        _ => Err(arity(name, 3, args.len())),
    }
}
