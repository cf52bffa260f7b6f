use super::{overload, unary, validator, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicOp {
    Not,
    Or,
    And,
}

fn all_booleans(types: &[Type]) -> bool {
    !types.is_empty() && types.iter().all(|t| *t == Type::Boolean)
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    vec![
        (
            "not",
            overload!([Type::Boolean] => |args: Vec<Expression>| {
                Function::expression("not", FunctionKind::Logic(LogicOp::Not), Type::Boolean, args)
            }),
        ),
        (
            "or",
            validator!(|types| all_booleans(types) => |args: Vec<Expression>| {
                Function::expression("or", FunctionKind::Logic(LogicOp::Or), Type::Boolean, args)
            }),
        ),
        (
            "and",
            validator!(|types| all_booleans(types) => |args: Vec<Expression>| {
                Function::expression("and", FunctionKind::Logic(LogicOp::And), Type::Boolean, args)
            }),
        ),
    ]
}

/// Or and and stop at the first argument that decides the result.
pub(super) fn calculate(op: LogicOp, args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    match op {
        LogicOp::Not => {
            let v = unary("not", args)?.calculate(ctx)?.as_boolean()?;
            Ok(AttributeValue::new_boolean(!v))
        }
        LogicOp::Or => {
            for arg in args {
                if arg.calculate(ctx)?.as_boolean()? {
                    return Ok(AttributeValue::new_boolean(true));
                }
            }
            Ok(AttributeValue::new_boolean(false))
        }
        LogicOp::And => {
            for arg in args {
                if !arg.calculate(ctx)?.as_boolean()? {
                    return Ok(AttributeValue::new_boolean(false));
                }
            }
            Ok(AttributeValue::new_boolean(true))
        }
    }
}
