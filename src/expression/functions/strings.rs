use super::{unary, validator, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::{Error, Result};

fn is_stringish(t: &Type) -> bool {
    matches!(
        t,
        Type::String | Type::SetOfStrings | Type::ListOfStrings | Type::Flags(_)
    )
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    vec![
        (
            "concat",
            validator!(|types| !types.is_empty() && types.iter().all(is_stringish) => |args: Vec<Expression>| {
                Function::expression("concat", FunctionKind::Concat, Type::ListOfStrings, args)
            }),
        ),
        (
            "list of strings",
            validator!(|types| types.len() == 1 && types.iter().all(is_stringish) => |args: Vec<Expression>| {
                Function::expression(
                    "list of strings",
                    FunctionKind::ListOfStrings,
                    Type::ListOfStrings,
                    args,
                )
            }),
        ),
    ]
}

/// Append the strings held by a value. Sets contribute in rank order and
/// flags contribute the names of their set bits.
fn append(v: &AttributeValue, out: &mut Vec<String>) -> Result<()> {
    match v.get_type() {
        Type::String => out.push(v.as_str()?.to_string()),
        Type::SetOfStrings => out.extend(v.as_set_of_strings()?.iter_ranked().cloned()),
        Type::ListOfStrings => out.extend(v.as_list_of_strings()?.iter().cloned()),
        Type::Flags(f) => out.extend(f.names(v.as_flags_mask()?).map(str::to_string)),
        other => {
            return Err(Error::value_type("String", other.name()));
        }
    }
    Ok(())
}

/// Join strings of all arguments into one list.
///
/// Arguments without a value are skipped. The call fails with a missing
/// value error only if every argument is missing. Any other error stops the
/// calculation at once.
pub(super) fn concat(args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    let mut out = Vec::new();
    let mut missing = 0;
    for arg in args {
        match arg.calculate(ctx) {
            Ok(v) => append(&v, &mut out)?,
            Err(e) if e.is_missing_value() => missing += 1,
            Err(e) => return Err(e),
        }
    }

    if missing == args.len() {
        return Err(Error::missing_value("no argument of concat has a value"));
    }
    Ok(AttributeValue::new_list_of_strings(out))
}

pub(super) fn list_of_strings(args: &[Expression], ctx: &Context) -> Result<AttributeValue> {
    let v = unary("list of strings", args)?.calculate(ctx)?;
    let mut out = Vec::new();
    append(&v, &mut out)?;
    Ok(AttributeValue::new_list_of_strings(out))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, call_in, i, s};
    use crate::core::{AttributeValue, Context, StringSet, Type};
    use crate::expression::{Expression, FunctionRegistry};

    #[test]
    fn test_concat_mixed_arguments() {
        let set: StringSet = ["y", "x"].iter().map(|s| s.to_string()).collect();
        let list = vec!["p".to_string(), "q".to_string()];

        let v = call(
            "concat",
            vec![
                s("a"),
                AttributeValue::new_set_of_strings(set).into(),
                AttributeValue::new_list_of_strings(list).into(),
            ],
        )
        .unwrap();
        assert_eq!(v.as_list_of_strings().unwrap(), ["a", "y", "x", "p", "q"]);
    }

    #[test]
    fn test_concat_flags() {
        let t = Type::flags("perm", ["read", "write", "exec"]).unwrap();
        let flags = AttributeValue::new_flags8(0b101, &t).unwrap();
        let v = call("concat", vec![flags.into()]).unwrap();
        assert_eq!(v.as_list_of_strings().unwrap(), ["read", "exec"]);
    }

    #[test]
    fn test_concat_skips_missing_values() {
        let ctx = Context::default();
        let missing = Expression::designator("x", Type::String);

        let v = call_in("concat", vec![missing.clone(), s("b")], &ctx).unwrap();
        assert_eq!(v.as_list_of_strings().unwrap(), ["b"]);

        let err = call_in("concat", vec![missing.clone(), missing.clone()], &ctx).unwrap_err();
        assert!(err.is_missing_value());
    }

    #[test]
    fn test_concat_broken_argument_is_fatal() {
        let registry = FunctionRegistry::builtin();
        let missing = registry
            .make(
                "list of strings",
                vec![Expression::designator("x", Type::String)],
            )
            .unwrap();
        let fatal = registry.make("split", vec![s("abc"), s("")]).unwrap();
        let e = registry.make("concat", vec![missing, fatal]).unwrap();
        let err = e.calculate(&Context::default()).unwrap_err();
        assert!(!err.is_missing_value());
        assert!(err.to_string().contains("separator is empty"));
    }

    #[test]
    fn test_list_of_strings() {
        let v = call("list of strings", vec![s("only")]).unwrap();
        assert_eq!(v.as_list_of_strings().unwrap(), ["only"]);
        assert!(call("list of strings", vec![i(1)]).is_err());
    }
}
