use super::{binary, overload, ternary, unary, validator, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Subtract => "subtract",
            ArithmeticOp::Multiply => "multiply",
            ArithmeticOp::Divide => "divide",
        }
    }
}

/// Representation the arithmetic runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Numeric {
    Integer,
    Float,
}

/// Convert integer arguments to float ones.
///
/// Integer literals are folded into float literals, anything else is
/// wrapped in a call of the "float" function.
pub(super) fn promote(args: Vec<Expression>) -> Result<Vec<Expression>> {
    args.into_iter()
        .map(|arg| {
            if *arg.result_type() != Type::Integer {
                return Ok(arg);
            }
            if let Some(v) = arg.as_value() {
                return Ok(AttributeValue::new_float(v.as_integer()? as f64).into());
            }
            Function::expression("float", FunctionKind::ToFloat, Type::Float, vec![arg])
        })
        .collect()
}

fn all_numeric_with_float(types: &[Type]) -> bool {
    types.iter().all(Type::is_numeric) && types.contains(&Type::Float)
}

macro_rules! arithmetic {
    ($name:literal, $op:expr) => {
        [
            (
                $name,
                overload!([Type::Integer, Type::Integer] => |args: Vec<Expression>| {
                    Function::expression(
                        $name,
                        FunctionKind::Arithmetic($op, Numeric::Integer),
                        Type::Integer,
                        args,
                    )
                }),
            ),
            (
                $name,
                overload!([Type::Float | Type::Integer, Type::Float | Type::Integer] => |args: Vec<Expression>| {
                    Function::expression(
                        $name,
                        FunctionKind::Arithmetic($op, Numeric::Float),
                        Type::Float,
                        promote(args)?,
                    )
                }),
            ),
        ]
    };
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    let mut validators: Vec<(&'static str, Validator)> = Vec::new();
    validators.extend(arithmetic!("add", ArithmeticOp::Add));
    validators.extend(arithmetic!("subtract", ArithmeticOp::Subtract));
    validators.extend(arithmetic!("multiply", ArithmeticOp::Multiply));
    validators.extend(arithmetic!("divide", ArithmeticOp::Divide));
    validators.push((
        "float",
        overload!([Type::Integer] => |args: Vec<Expression>| {
            Function::expression("float", FunctionKind::ToFloat, Type::Float, args)
        }),
    ));
    validators.push((
        "range",
        overload!([Type::Integer, Type::Integer, Type::Integer] => |args: Vec<Expression>| {
            Function::expression("range", FunctionKind::Range(Numeric::Integer), Type::String, args)
        }),
    ));
    validators.push((
        "range",
        validator!(|types| types.len() == 3 && all_numeric_with_float(types) => |args: Vec<Expression>| {
            Function::expression(
                "range",
                FunctionKind::Range(Numeric::Float),
                Type::String,
                promote(args)?,
            )
        }),
    ));
    validators
}

fn check_float(op: ArithmeticOp, v: f64) -> Result<AttributeValue> {
    if v.is_nan() {
        Err(Error::function(op.name(), "Float result has a value of NaN"))
    } else if v == f64::INFINITY {
        Err(Error::function(op.name(), "Float result has a value of Inf"))
    } else if v == f64::NEG_INFINITY {
        Err(Error::function(op.name(), "Float result has a value of -Inf"))
    } else {
        Ok(AttributeValue::new_float(v))
    }
}

pub(super) fn arithmetic(
    op: ArithmeticOp,
    numeric: Numeric,
    args: &[Expression],
    ctx: &Context,
) -> Result<AttributeValue> {
    let (a, b) = binary(op.name(), args)?;
    let (a, b) = (a.calculate(ctx)?, b.calculate(ctx)?);

    match numeric {
        Numeric::Integer => {
            let (x, y) = (a.as_integer()?, b.as_integer()?);
            if op == ArithmeticOp::Divide && y == 0 {
                return Err(Error::function(op.name(), "Integer divisor has a value of 0"));
            }
            let result = match op {
                ArithmeticOp::Add => x.checked_add(y),
                ArithmeticOp::Subtract => x.checked_sub(y),
                ArithmeticOp::Multiply => x.checked_mul(y),
                ArithmeticOp::Divide => x.checked_div(y),
            };
            result
                .map(AttributeValue::new_integer)
                .ok_or_else(|| Error::function(op.name(), "Integer overflow"))
        }
        Numeric::Float => {
            let (x, y) = (a.as_float()?, b.as_float()?);
            let result = match op {
                ArithmeticOp::Add => x + y,
                ArithmeticOp::Subtract => x - y,
                ArithmeticOp::Multiply => x * y,
                ArithmeticOp::Divide => {
                    if y == 0.0 {
                        return Err(Error::function(op.name(), "Float divisor has a value of 0"));
                    }
                    x / y
                }
            };
            check_float(op, result)
        }
    }
}

/// Place a value relative to the closed interval [min, max].
pub(super) fn range(numeric: Numeric, args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    let (min, max, value) = ternary("range", args)?;
    let (min, max, value) = (min.calculate(ctx)?, max.calculate(ctx)?, value.calculate(ctx)?);

    let place = match numeric {
        Numeric::Integer => position(min.as_integer()?, max.as_integer()?, value.as_integer()?),
        Numeric::Float => position(min.as_float()?, max.as_float()?, value.as_float()?),
    };
    Ok(AttributeValue::new_string(place))
}

fn position<T: PartialOrd>(min: T, max: T, value: T) -> &'static str {
    if value < min {
        "Below"
    } else if value > max {
        "Above"
    } else {
        "Within"
    }
}

pub(super) fn to_float(args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    let v = unary("float", args)?.calculate(ctx)?.as_integer()?;
    Ok(AttributeValue::new_float(v as f64))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, call_in, f, i, s};
    use crate::core::{AttributeValue, Context, Type};
    use crate::expression::{Expression, FunctionRegistry};

    #[test]
    fn test_integer_division_by_zero() {
        let err = call("divide", vec![i(27), i(0)]).unwrap_err();
        assert!(err.to_string().contains("Integer divisor has a value of 0"));
        assert_eq!(call("divide", vec![i(27), i(4)]).unwrap().as_integer().unwrap(), 6);
    }

    #[test]
    fn test_float_errors() {
        let err = call("divide", vec![f(1.0), f(0.0)]).unwrap_err();
        assert!(err.to_string().contains("Float divisor has a value of 0"));

        let err = call("multiply", vec![f(f64::MAX), f(2.0)]).unwrap_err();
        assert!(err.to_string().contains("Float result has a value of Inf"));

        let err = call("multiply", vec![f(f64::MAX), f(-2.0)]).unwrap_err();
        assert!(err.to_string().contains("Float result has a value of -Inf"));

        let err = call("subtract", vec![f(f64::INFINITY), f(f64::INFINITY)]).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_integer_overflow() {
        let err = call("add", vec![i(i64::MAX), i(1)]).unwrap_err();
        assert!(err.to_string().contains("Integer overflow"));
        assert!(call("divide", vec![i(i64::MIN), i(-1)]).is_err());
    }

    #[test]
    fn test_promotion_of_literals_and_designators() {
        let registry = FunctionRegistry::builtin();

        let e = registry.make("add", vec![i(1), f(0.5)]).unwrap();
        let Expression::Function(func) = &e else {
            panic!("expected function call");
        };
        assert!(func.args()[0].as_value().is_some());

        let x = Expression::designator("x", Type::Integer);
        let e = registry.make("subtract", vec![f(10.0), x]).unwrap();
        let Expression::Function(func) = &e else {
            panic!("expected function call");
        };
        assert_eq!(func.args()[1].result_type(), &Type::Float);

        let ctx =
            Context::from_values(None, [("x", AttributeValue::new_integer(4))]).unwrap();
        assert_eq!(e.calculate(&ctx).unwrap().as_float().unwrap(), 6.0);
    }

    #[test]
    fn test_range() {
        let at = |v| call("range", vec![i(1), i(10), v]).unwrap();
        assert_eq!(at(i(0)).as_str().unwrap(), "Below");
        assert_eq!(at(i(1)).as_str().unwrap(), "Within");
        assert_eq!(at(i(10)).as_str().unwrap(), "Within");
        assert_eq!(at(i(11)).as_str().unwrap(), "Above");

        let v = call("range", vec![f(0.5), i(1), f(0.75)]).unwrap();
        assert_eq!(v.as_str().unwrap(), "Within");

        assert!(call("range", vec![s("a"), i(1), i(2)]).is_err());
    }

    #[test]
    fn test_missing_operand_propagates() {
        let x = Expression::designator("x", Type::Integer);
        let err = call_in("add", vec![x, i(1)], &Context::default()).unwrap_err();
        assert!(err.is_missing_value());
    }
}
