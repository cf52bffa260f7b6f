use super::{binary, overload, unary, Function, FunctionKind};
use crate::core::{AttributeValue, Context, Type};
use crate::expression::{Expression, FunctionMaker, Validator};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionOp {
    SubstringOf,
    NetworkHasAddress,
    StringSetHas,
    NetworkSetHasAddress,
    NetworkSetHasNetwork,
    DomainSetHas,
    ListHas,
    IntersectStrings,
    IntersectNetworks,
    IntersectDomains,
    Len,
    Split,
}

impl CollectionOp {
    fn name(self) -> &'static str {
        match self {
            CollectionOp::IntersectStrings
            | CollectionOp::IntersectNetworks
            | CollectionOp::IntersectDomains => "intersect",
            CollectionOp::Len => "len",
            CollectionOp::Split => "split",
            _ => "contains",
        }
    }
}

fn contains(op: CollectionOp, args: Vec<Expression>) -> Result<Expression> {
    Function::expression("contains", FunctionKind::Collection(op), Type::Boolean, args)
}

fn intersect(op: CollectionOp, t: Type, args: Vec<Expression>) -> Result<Expression> {
    Function::expression("intersect", FunctionKind::Collection(op), t, args)
}

fn len(args: Vec<Expression>) -> Result<Expression> {
    Function::expression("len", FunctionKind::Collection(CollectionOp::Len), Type::Integer, args)
}

pub(super) fn validators() -> Vec<(&'static str, Validator)> {
    vec![
        (
            "contains",
            overload!([Type::String, Type::String] => |args: Vec<Expression>| {
                contains(CollectionOp::SubstringOf, args)
            }),
        ),
        (
            "contains",
            overload!([Type::Network, Type::Address] => |args: Vec<Expression>| {
                contains(CollectionOp::NetworkHasAddress, args)
            }),
        ),
        (
            "contains",
            overload!([Type::SetOfStrings, Type::String] => |args: Vec<Expression>| {
                contains(CollectionOp::StringSetHas, args)
            }),
        ),
        (
            "contains",
            overload!([Type::SetOfNetworks, Type::Address] => |args: Vec<Expression>| {
                contains(CollectionOp::NetworkSetHasAddress, args)
            }),
        ),
        (
            "contains",
            overload!([Type::SetOfNetworks, Type::Network] => |args: Vec<Expression>| {
                contains(CollectionOp::NetworkSetHasNetwork, args)
            }),
        ),
        (
            "contains",
            overload!([Type::SetOfDomains, Type::Domain] => |args: Vec<Expression>| {
                contains(CollectionOp::DomainSetHas, args)
            }),
        ),
        (
            "contains",
            overload!([Type::ListOfStrings, Type::String] => |args: Vec<Expression>| {
                contains(CollectionOp::ListHas, args)
            }),
        ),
        (
            "intersect",
            overload!([Type::SetOfStrings, Type::SetOfStrings] => |args: Vec<Expression>| {
                intersect(CollectionOp::IntersectStrings, Type::SetOfStrings, args)
            }),
        ),
        (
            "intersect",
            overload!([Type::SetOfNetworks, Type::SetOfNetworks] => |args: Vec<Expression>| {
                intersect(CollectionOp::IntersectNetworks, Type::SetOfNetworks, args)
            }),
        ),
        (
            "intersect",
            overload!([Type::SetOfDomains, Type::SetOfDomains] => |args: Vec<Expression>| {
                intersect(CollectionOp::IntersectDomains, Type::SetOfDomains, args)
            }),
        ),
        (
            "len",
            overload!([Type::SetOfStrings | Type::SetOfNetworks | Type::SetOfDomains | Type::ListOfStrings] => len),
        ),
        (
            "split",
            overload!([Type::String, Type::String] => |args: Vec<Expression>| {
                Function::expression(
                    "split",
                    FunctionKind::Collection(CollectionOp::Split),
                    Type::ListOfStrings,
                    args,
                )
            }),
        ),
    ]
}

pub(super) fn calculate(
    op: CollectionOp,
    args: &[Expression],
    ctx: &Context,
) -> Result<AttributeValue> {
    if op == CollectionOp::Len {
        let v = unary("len", args)?.calculate(ctx)?;
        let n = match v.get_type() {
            Type::SetOfStrings => v.as_set_of_strings()?.len(),
            Type::SetOfNetworks => v.as_set_of_networks()?.len(),
            Type::SetOfDomains => v.as_set_of_domains()?.len(),
            _ => v.as_list_of_strings()?.len(),
        };
        return Ok(AttributeValue::new_integer(n as i64));
    }

    let (a, b) = binary(op.name(), args)?;
    let (a, b) = (a.calculate(ctx)?, b.calculate(ctx)?);

    let v = match op {
        CollectionOp::SubstringOf => AttributeValue::new_boolean(a.as_str()?.contains(b.as_str()?)),
        CollectionOp::NetworkHasAddress => {
            AttributeValue::new_boolean(a.as_network()?.contains(&b.as_address()?))
        }
        CollectionOp::StringSetHas => {
            AttributeValue::new_boolean(a.as_set_of_strings()?.contains(&b.as_str()?.to_string()))
        }
        CollectionOp::NetworkSetHasAddress => {
            AttributeValue::new_boolean(a.as_set_of_networks()?.contains_address(&b.as_address()?))
        }
        CollectionOp::NetworkSetHasNetwork => {
            AttributeValue::new_boolean(a.as_set_of_networks()?.contains(&b.as_network()?))
        }
        CollectionOp::DomainSetHas => {
            AttributeValue::new_boolean(a.as_set_of_domains()?.contains_domain(b.as_domain()?))
        }
        CollectionOp::ListHas => {
            let needle = b.as_str()?;
            AttributeValue::new_boolean(a.as_list_of_strings()?.iter().any(|s| s == needle))
        }
        CollectionOp::IntersectStrings => AttributeValue::new_set_of_strings(
            a.as_set_of_strings()?.intersect(b.as_set_of_strings()?),
        ),
        CollectionOp::IntersectNetworks => AttributeValue::new_set_of_networks(
            a.as_set_of_networks()?.intersect(b.as_set_of_networks()?),
        ),
        CollectionOp::IntersectDomains => AttributeValue::new_set_of_domains(
            a.as_set_of_domains()?.intersect(b.as_set_of_domains()?),
        ),
        CollectionOp::Split => {
            let separator = b.as_str()?;
            if separator.is_empty() {
                return Err(Error::function("split", "separator is empty"));
            }
            AttributeValue::new_list_of_strings(
                a.as_str()?.split(separator).map(str::to_string).collect(),
            )
        }
        CollectionOp::Len => return Err(Error::internal("len takes one argument")),
    };
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, s};
    use crate::core::{AttributeValue, Domain, DomainSet, NetworkSet, StringSet};
    use crate::expression::Expression;

    fn strings(items: &[&str]) -> Expression {
        AttributeValue::new_set_of_strings(items.iter().map(|s| s.to_string()).collect::<StringSet>())
            .into()
    }

    fn domains(items: &[&str]) -> Expression {
        AttributeValue::new_set_of_domains(
            items
                .iter()
                .map(|d| Domain::new(d).unwrap())
                .collect::<DomainSet>(),
        )
        .into()
    }

    fn address(v: &str) -> Expression {
        AttributeValue::new_address(v.parse().unwrap()).into()
    }

    #[test]
    fn test_contains() {
        let yes = |name, args| call(name, args).unwrap().as_boolean().unwrap();

        assert!(yes("contains", vec![s("haystack"), s("st")]));
        assert!(!yes("contains", vec![s("haystack"), s("needle")]));
        assert!(yes("contains", vec![strings(&["a", "b"]), s("b")]));

        let nets = AttributeValue::new_set_of_networks(
            ["10.0.0.0/8", "192.0.2.0/24"]
                .iter()
                .map(|n| n.parse().unwrap())
                .collect::<NetworkSet>(),
        );
        assert!(yes("contains", vec![nets.clone().into(), address("192.0.2.10")]));
        assert!(!yes("contains", vec![nets.into(), address("198.51.100.1")]));

        let d = AttributeValue::new_domain(Domain::new("www.example.com").unwrap()).into();
        assert!(yes("contains", vec![domains(&["example.com"]), d]));
    }

    #[test]
    fn test_intersect_keeps_left_ranks() {
        let v = call("intersect", vec![strings(&["c", "a", "b"]), strings(&["b", "c"])]).unwrap();
        let items: Vec<&String> = v.as_set_of_strings().unwrap().iter_ranked().collect();
        assert_eq!(items, vec!["c", "b"]);
    }

    #[test]
    fn test_len_and_split() {
        let v = call("split", vec![s("a,b,,c"), s(",")]).unwrap();
        assert_eq!(v.as_list_of_strings().unwrap(), ["a", "b", "", "c"]);

        let n = call("len", vec![v.into()]).unwrap();
        assert_eq!(n.as_integer().unwrap(), 4);

        assert!(call("split", vec![s("abc"), s("")]).is_err());
        assert!(call("len", vec![s("abc")]).is_err());
    }
}
