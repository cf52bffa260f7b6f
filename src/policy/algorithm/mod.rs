//! Combining algorithms.
//!
//! The same algorithms combine rules inside a policy and policies inside a
//! policy set. Children are anything implementing [`Combinable`].

mod mapper;

pub use mapper::{FlagsMapperAlgorithm, MapperAlgorithm, MapperOrder};

use super::{Effect, Response};
use crate::core::{Attribute, Context};
use crate::{Error, Result};

use std::sync::Arc;

/// A child of a combining algorithm.
pub trait Combinable {
    /// Child id, `None` for hidden children.
    fn id(&self) -> Option<&str>;

    /// Evaluate the child.
    fn evaluate(&self, ctx: &Context) -> Response;
}

impl<T: Combinable + ?Sized> Combinable for Arc<T> {
    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn evaluate(&self, ctx: &Context) -> Response {
        (**self).evaluate(ctx)
    }
}

/// Strategy folding child responses into one.
#[derive(Debug, Clone, Default)]
pub enum CombiningAlgorithm {
    /// First child that is applicable wins
    #[default]
    FirstApplicable,
    /// Deny wins over Permit
    DenyOverrides,
    /// Permit wins over Deny
    PermitOverrides,
    /// Children selected by a string key
    Mapper(Box<MapperAlgorithm>),
    /// Children selected by flag bits
    FlagsMapper(Box<FlagsMapperAlgorithm>),
}

impl CombiningAlgorithm {
    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            CombiningAlgorithm::FirstApplicable => "first-applicable",
            CombiningAlgorithm::DenyOverrides => "deny-overrides",
            CombiningAlgorithm::PermitOverrides => "permit-overrides",
            CombiningAlgorithm::Mapper(_) => "mapper",
            CombiningAlgorithm::FlagsMapper(_) => "flags-mapper",
        }
    }

    /// Check if the algorithm combines every child uniformly.
    pub fn is_plain(&self) -> bool {
        matches!(
            self,
            CombiningAlgorithm::FirstApplicable
                | CombiningAlgorithm::DenyOverrides
                | CombiningAlgorithm::PermitOverrides
        )
    }

    /// Attribute the algorithm dispatches on, if it's a mapper over a
    /// designator.
    pub fn dispatch_attribute(&self) -> Option<&Attribute> {
        match self {
            CombiningAlgorithm::Mapper(m) => m.argument().as_designator(),
            CombiningAlgorithm::FlagsMapper(m) => m.argument().as_designator(),
            _ => None,
        }
    }

    /// Check if a target error must make the node Indeterminate rather than
    /// NotApplicable.
    ///
    /// That's the case when the error is a missing attribute which is the
    /// very attribute a mapper dispatches on.
    pub fn propagates(&self, error: &Error) -> bool {
        let Some(attribute) = self.dispatch_attribute() else {
            return false;
        };
        matches!(
            error.root_cause(),
            Error::MissingAttribute { id, type_name }
                if id == attribute.id() && type_name == attribute.get_type().name()
        )
    }

    /// Rebuild dispatch indexes for the given children.
    pub fn bind<T: Combinable>(&self, children: &[T]) -> Result<Self> {
        Ok(match self {
            CombiningAlgorithm::Mapper(m) => CombiningAlgorithm::Mapper(Box::new(m.bind(children)?)),
            CombiningAlgorithm::FlagsMapper(m) => {
                CombiningAlgorithm::FlagsMapper(Box::new(m.bind(children)?))
            }
            plain => plain.clone(),
        })
    }

    /// Drop references to a deleted child.
    pub(crate) fn forget(&self, id: &str) -> Self {
        match self {
            CombiningAlgorithm::Mapper(m) => CombiningAlgorithm::Mapper(Box::new(m.forget(id))),
            CombiningAlgorithm::FlagsMapper(m) => {
                CombiningAlgorithm::FlagsMapper(Box::new(m.forget(id)))
            }
            plain => plain.clone(),
        }
    }

    /// Combine the children.
    pub fn execute<T: Combinable>(&self, children: &[T], ctx: &Context) -> Response {
        match self {
            CombiningAlgorithm::Mapper(m) => m.execute(children, ctx),
            CombiningAlgorithm::FlagsMapper(m) => m.execute(children, ctx),
            plain => plain.combine(children.iter(), ctx),
        }
    }

    /// Combine children with a plain algorithm.
    pub(crate) fn combine<'a, T, I>(&self, children: I, ctx: &Context) -> Response
    where
        T: Combinable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        match self {
            CombiningAlgorithm::DenyOverrides => overrides(Effect::Deny, children, ctx),
            CombiningAlgorithm::PermitOverrides => overrides(Effect::Permit, children, ctx),
            _ => first_applicable(children, ctx),
        }
    }
}

fn first_applicable<'a, T, I>(children: I, ctx: &Context) -> Response
where
    T: Combinable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut errors = Vec::new();
    for child in children {
        let r = child.evaluate(ctx);
        if r.effect != Effect::NotApplicable {
            return r;
        }
        errors.extend(r.status);
    }

    Response {
        effect: Effect::NotApplicable,
        status: Error::collect(errors),
        obligations: Vec::new(),
    }
}

/// Deny-overrides when `winner` is Deny, permit-overrides when it's Permit.
///
/// The winning effect returns at once. The other decisive effect holds only
/// if no child could have produced the winner; otherwise the result is
/// Indeterminate. Obligations of every child with the losing effect are
/// collected for the case it holds.
fn overrides<'a, T, I>(winner: Effect, children: I, ctx: &Context) -> Response
where
    T: Combinable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let (loser, winner_ind, loser_ind) = match winner {
        Effect::Deny => (Effect::Permit, Effect::IndeterminateD, Effect::IndeterminateP),
        _ => (Effect::Deny, Effect::IndeterminateP, Effect::IndeterminateD),
    };

    let mut errors = Vec::new();
    let mut obligations = Vec::new();
    let (mut any_both, mut any_winner_ind, mut any_loser_ind, mut any_loser) =
        (false, false, false, false);

    for child in children {
        let r = child.evaluate(ctx);
        match r.effect {
            e if e == winner => return r,
            e if e == loser => {
                any_loser = true;
                obligations.extend(r.obligations);
            }
            Effect::Indeterminate => any_both = true,
            e if e == winner_ind => any_winner_ind = true,
            e if e == loser_ind => any_loser_ind = true,
            _ => {}
        }
        errors.extend(r.status);
    }

    let effect = if any_both || (any_winner_ind && (any_loser_ind || any_loser)) {
        Effect::Indeterminate
    } else if any_winner_ind {
        winner_ind
    } else if any_loser {
        return Response::new(loser).with_obligations(obligations);
    } else if any_loser_ind {
        loser_ind
    } else {
        Effect::NotApplicable
    };

    Response {
        effect,
        status: Error::collect(errors),
        obligations: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::{Attribute, AttributeAssignment, AttributeValue, Type};

    /// Child with a fixed response, for exercising algorithms.
    #[derive(Debug, Clone)]
    pub struct Fixed {
        pub id: Option<String>,
        pub effect: Effect,
    }

    pub fn fixed(id: &str, effect: Effect) -> Fixed {
        Fixed {
            id: Some(id.to_string()),
            effect,
        }
    }

    impl Combinable for Fixed {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn evaluate(&self, _ctx: &Context) -> Response {
            let id = self.id.clone().unwrap_or_default();
            let mut r = Response::new(self.effect);
            if self.effect.is_decisive() {
                r.obligations.push(AttributeAssignment::new(
                    Attribute::new("from", Type::String),
                    AttributeValue::new_string(id),
                ));
            } else if self.effect.is_indeterminate() {
                r.status = Some(Error::function("test", format!("{} failed", id)));
            }
            r
        }
    }

    pub fn sources(r: &Response) -> Vec<String> {
        r.obligations
            .iter()
            .map(|o| {
                o.calculate(&Context::default())
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            })
            .collect()
    }
}
