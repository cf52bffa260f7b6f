use super::numeric::promote;
use super::{binary, overload, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    EqualBoolean,
    EqualString,
    EqualInteger,
    EqualFloat,
    EqualAddress,
    EqualNetwork,
    EqualDomain,
    GreaterInteger,
    GreaterFloat,
}

fn make(name: &'static str, op: CompareOp, args: Vec<Expression>) -> Result<Expression> {
    Function::expression(name, FunctionKind::Compare(op), Type::Boolean, args)
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    vec![
        (
            "equal",
            overload!([Type::Boolean, Type::Boolean] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualBoolean, args)
            }),
        ),
        (
            "equal",
            overload!([Type::String, Type::String] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualString, args)
            }),
        ),
        (
            "equal",
            overload!([Type::Integer, Type::Integer] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualInteger, args)
            }),
        ),
        (
            "equal",
            overload!([Type::Float | Type::Integer, Type::Float | Type::Integer] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualFloat, promote(args)?)
            }),
        ),
        (
            "equal",
            overload!([Type::Address, Type::Address] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualAddress, args)
            }),
        ),
        (
            "equal",
            overload!([Type::Network, Type::Network] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualNetwork, args)
            }),
        ),
        (
            "equal",
            overload!([Type::Domain, Type::Domain] => |args: Vec<Expression>| {
                make("equal", CompareOp::EqualDomain, args)
            }),
        ),
        (
            "greater",
            overload!([Type::Integer, Type::Integer] => |args: Vec<Expression>| {
                make("greater", CompareOp::GreaterInteger, args)
            }),
        ),
        (
            "greater",
            overload!([Type::Float | Type::Integer, Type::Float | Type::Integer] => |args: Vec<Expression>| {
                make("greater", CompareOp::GreaterFloat, promote(args)?)
            }),
        ),
    ]
}

pub(super) fn calculate(
    op: CompareOp,
    args: &[Expression],
    ctx: &Context,
) -> Result<AttributeValue> {
    let name = match op {
        CompareOp::GreaterInteger | CompareOp::GreaterFloat => "greater",
        _ => "equal",
    };
    let (a, b) = binary(name, args)?;
    let (a, b) = (a.calculate(ctx)?, b.calculate(ctx)?);

    let result = match op {
        CompareOp::EqualBoolean => a.as_boolean()? == b.as_boolean()?,
        CompareOp::EqualString => a.as_str()? == b.as_str()?,
        CompareOp::EqualInteger => a.as_integer()? == b.as_integer()?,
        CompareOp::EqualFloat => a.as_float()? == b.as_float()?,
        CompareOp::EqualAddress => a.as_address()? == b.as_address()?,
        CompareOp::EqualNetwork => a.as_network()? == b.as_network()?,
        CompareOp::EqualDomain => a.as_domain()? == b.as_domain()?,
        CompareOp::GreaterInteger => a.as_integer()? > b.as_integer()?,
        CompareOp::GreaterFloat => a.as_float()? > b.as_float()?,
    };
    Ok(AttributeValue::new_boolean(result))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{b, call, f, i, s};
    use crate::core::{AttributeValue, Domain};

    fn yes(v: crate::Result<AttributeValue>) -> bool {
        v.unwrap().as_boolean().unwrap()
    }

    #[test]
    fn test_equal_overloads() {
        assert!(yes(call("equal", vec![s("a"), s("a")])));
        assert!(!yes(call("equal", vec![s("a"), s("b")])));
        assert!(yes(call("equal", vec![b(false), b(false)])));
        assert!(yes(call("equal", vec![i(3), i(3)])));
        assert!(yes(call("equal", vec![i(3), f(3.0)])));
        assert!(yes(call("equal", vec![f(2.5), f(2.5)])));

        let d = |v: &str| AttributeValue::new_domain(Domain::new(v).unwrap()).into();
        assert!(yes(call("equal", vec![d("Example.ORG."), d("example.org")])));
    }

    #[test]
    fn test_greater_promotes_integers() {
        assert!(yes(call("greater", vec![i(4), i(3)])));
        assert!(!yes(call("greater", vec![i(3), i(3)])));
        assert!(yes(call("greater", vec![f(3.5), i(3)])));
        assert!(!yes(call("greater", vec![i(3), f(3.5)])));
    }

    #[test]
    fn test_mismatched_types_rejected() {
        assert!(call("equal", vec![s("1"), i(1)]).is_err());
        assert!(call("greater", vec![s("b"), s("a")]).is_err());
    }
}
