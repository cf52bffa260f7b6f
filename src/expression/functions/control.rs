use super::{validator, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::{Error, Result};

fn same_type(types: &[Type]) -> bool {
    match types.split_first() {
        Some((first, rest)) => rest.iter().all(|t| t == first),
        None => false,
    }
}

fn make_try(args: Vec<Expression>) -> Result<Expression> {
    let t = args
        .first()
        .map(|a| a.result_type().clone())
        .ok_or_else(|| Error::function_arguments("try", "expected at least one argument"))?;
    Function::expression("try", FunctionKind::Try, t, args)
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    vec![("try", validator!(|types| same_type(types) => make_try))]
}

/// Value of the first argument that calculates without error, or the error
/// of the last one.
pub(super) fn first_success(args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    let mut last = None;
    for arg in args {
        match arg.calculate(ctx) {
            Ok(v) => return Ok(v),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| Error::internal("try has no arguments")))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, call_in, i, s};
    use crate::core::{AttributeValue, Context, Type};
    use crate::expression::Expression;
    use crate::Error;

    #[test]
    fn test_try_falls_back() {
        let x = Expression::designator("x", Type::String);

        let v = call_in("try", vec![x.clone(), s("value")], &Context::default()).unwrap();
        assert_eq!(v.as_str().unwrap(), "value");

        let ctx =
            Context::from_values(None, [("x", AttributeValue::new_string("override"))]).unwrap();
        let v = call_in("try", vec![x, s("value")], &ctx).unwrap();
        assert_eq!(v.as_str().unwrap(), "override");
    }

    #[test]
    fn test_try_returns_last_error() {
        let x = Expression::designator("x", Type::Integer);
        let divide = crate::expression::FunctionRegistry::builtin()
            .make("divide", vec![i(1), i(0)])
            .unwrap();

        let err = call_in("try", vec![x, divide], &Context::default()).unwrap_err();
        assert!(err.to_string().contains("Integer divisor has a value of 0"));
    }

    #[test]
    fn test_try_requires_one_type() {
        assert!(matches!(
            call("try", vec![s("a"), i(1)]),
            Err(Error::FunctionArguments { .. })
        ));
        assert!(call("try", vec![]).is_err());
    }
}
