//! Mapper combining algorithms.
//!
//! A mapper calculates its argument and picks children whose ids match the
//! value. Several selected children are combined with a nested plain
//! algorithm in the mapper's order.

use super::{Combinable, CombiningAlgorithm};
use crate::core::{AttributeValue, Context, FlagsType, Type};
use crate::expression::Expression;
use crate::policy::{Effect, Response};
use crate::{Error, Result};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Order in which selected children are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapperOrder {
    /// Order of child ids
    #[default]
    Internal,
    /// Order of the elements of the dispatch value
    External,
}

/// Child referenced by id, with its position once bound.
#[derive(Debug, Clone)]
struct Slot {
    id: String,
    index: Option<usize>,
}

impl Slot {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index: None,
        }
    }
}

/// Default and error children shared by both mapper kinds.
#[derive(Debug, Clone, Default)]
struct Fallbacks {
    default: Option<Slot>,
    error: Option<Slot>,
}

impl Fallbacks {
    fn bind<T: Combinable>(&self, children: &[T]) -> Self {
        let find = |slot: &Slot| Slot {
            id: slot.id.clone(),
            index: children.iter().position(|c| c.id() == Some(slot.id.as_str())),
        };

        Self {
            default: self.default.as_ref().map(find),
            error: self.error.as_ref().map(find),
        }
    }

    fn forget(&self, id: &str) -> Self {
        let keep = |slot: &Option<Slot>| slot.clone().filter(|s| s.id != id);
        Self {
            default: keep(&self.default),
            error: keep(&self.error),
        }
    }

    fn is_fallback(&self, id: &str) -> bool {
        [&self.default, &self.error]
            .into_iter()
            .flatten()
            .any(|s| s.id == id)
    }

    fn on_default<T: Combinable>(&self, children: &[T], ctx: &Context) -> Response {
        match self.default.as_ref().and_then(|s| s.index).and_then(|i| children.get(i)) {
            Some(child) => child.evaluate(ctx),
            None => Response::not_applicable(),
        }
    }

    fn on_error<T: Combinable>(&self, children: &[T], ctx: &Context, e: Error) -> Response {
        match self.error.as_ref().and_then(|s| s.index).and_then(|i| children.get(i)) {
            Some(child) => child.evaluate(ctx),
            None => Response::indeterminate(Effect::Indeterminate, e),
        }
    }
}

fn check_plain(algorithm: &CombiningAlgorithm) -> Result<()> {
    if algorithm.is_plain() {
        Ok(())
    } else {
        Err(Error::validation_field(
            format!("Mapper can't nest {} algorithm", algorithm.name()),
            "algorithm",
        ))
    }
}

fn combine<T: Combinable>(
    algorithm: &CombiningAlgorithm,
    children: &[T],
    selected: &[usize],
    ctx: &Context,
) -> Response {
    algorithm.combine(selected.iter().filter_map(|&i| children.get(i)), ctx)
}

/// Mapper over a String, SetOfStrings or ListOfStrings argument.
#[derive(Debug, Clone)]
pub struct MapperAlgorithm {
    argument: Expression,
    index: BTreeMap<String, usize>,
    fallbacks: Fallbacks,
    order: MapperOrder,
    algorithm: CombiningAlgorithm,
}

impl MapperAlgorithm {
    /// Create a mapper dispatching on the given argument.
    pub fn new(argument: Expression) -> Result<Self> {
        match argument.result_type() {
            Type::String | Type::SetOfStrings | Type::ListOfStrings => Ok(Self {
                argument,
                index: BTreeMap::new(),
                fallbacks: Fallbacks::default(),
                order: MapperOrder::Internal,
                algorithm: CombiningAlgorithm::FirstApplicable,
            }),
            other => Err(Error::validation_field(
                format!(
                    "Mapper argument must be String, Set of Strings or List of Strings but is {}",
                    other
                ),
                "argument",
            )),
        }
    }

    /// Child evaluated when no child matches.
    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.fallbacks.default = Some(Slot::new(id));
        self
    }

    /// Child evaluated when the argument can't be calculated.
    pub fn with_error(mut self, id: impl Into<String>) -> Self {
        self.fallbacks.error = Some(Slot::new(id));
        self
    }

    /// Set the order of selected children.
    pub fn with_order(mut self, order: MapperOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the algorithm combining selected children.
    pub fn with_algorithm(mut self, algorithm: CombiningAlgorithm) -> Result<Self> {
        check_plain(&algorithm)?;
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Dispatch argument.
    pub fn argument(&self) -> &Expression {
        &self.argument
    }

    /// Order of selected children.
    pub fn order(&self) -> MapperOrder {
        self.order
    }

    /// Id of the default child.
    pub fn default_id(&self) -> Option<&str> {
        self.fallbacks.default.as_ref().map(|s| s.id.as_str())
    }

    /// Id of the error child.
    pub fn error_id(&self) -> Option<&str> {
        self.fallbacks.error.as_ref().map(|s| s.id.as_str())
    }

    pub(crate) fn bind<T: Combinable>(&self, children: &[T]) -> Result<Self> {
        let index = children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.id().map(|id| (id.to_string(), i)))
            .collect();

        Ok(Self {
            index,
            fallbacks: self.fallbacks.bind(children),
            ..self.clone()
        })
    }

    pub(crate) fn forget(&self, id: &str) -> Self {
        let mut index = self.index.clone();
        index.remove(id);
        Self {
            index,
            fallbacks: self.fallbacks.forget(id),
            ..self.clone()
        }
    }

    pub(crate) fn execute<T: Combinable>(&self, children: &[T], ctx: &Context) -> Response {
        let selected = match self
            .argument
            .calculate(ctx)
            .and_then(|v| self.select(&v))
        {
            Ok(selected) => selected,
            Err(e) => return self.fallbacks.on_error(children, ctx, e),
        };

        match selected.as_slice() {
            [] => self.fallbacks.on_default(children, ctx),
            [i] if *self.argument.result_type() == Type::String => match children.get(*i) {
                Some(child) => child.evaluate(ctx),
                None => self.fallbacks.on_default(children, ctx),
            },
            _ => combine(&self.algorithm, children, &selected, ctx),
        }
    }

    fn select(&self, value: &AttributeValue) -> Result<Vec<usize>> {
        Ok(match value.get_type() {
            Type::String => self.index.get(value.as_str()?).copied().into_iter().collect(),
            Type::SetOfStrings => {
                let set = value.as_set_of_strings()?;
                match self.order {
                    MapperOrder::Internal => self
                        .index
                        .iter()
                        .filter(|(id, _)| set.contains(*id))
                        .map(|(_, i)| *i)
                        .collect(),
                    MapperOrder::External => set
                        .iter_ranked()
                        .filter_map(|id| self.index.get(id).copied())
                        .collect(),
                }
            }
            Type::ListOfStrings => {
                let list = value.as_list_of_strings()?;
                match self.order {
                    MapperOrder::Internal => self
                        .index
                        .iter()
                        .filter(|(id, _)| list.contains(id))
                        .map(|(_, i)| *i)
                        .collect(),
                    MapperOrder::External => {
                        let mut seen = HashSet::new();
                        list.iter()
                            .filter(|id| seen.insert(id.as_str()))
                            .filter_map(|id| self.index.get(id).copied())
                            .collect()
                    }
                }
            }
            other => return Err(Error::value_type(self.argument.result_type().name(), other.name())),
        })
    }
}

impl From<MapperAlgorithm> for CombiningAlgorithm {
    fn from(m: MapperAlgorithm) -> Self {
        CombiningAlgorithm::Mapper(Box::new(m))
    }
}

/// Mapper over a flags argument.
///
/// Children are indexed by the bit of the flag named by their id. Ids that
/// aren't flag names are only allowed for the default and error children.
#[derive(Debug, Clone)]
pub struct FlagsMapperAlgorithm {
    argument: Expression,
    flags: Arc<FlagsType>,
    index: Vec<Option<usize>>,
    fallbacks: Fallbacks,
    order: MapperOrder,
    algorithm: CombiningAlgorithm,
}

impl FlagsMapperAlgorithm {
    /// Create a mapper dispatching on the given flags argument.
    pub fn new(argument: Expression) -> Result<Self> {
        let flags = match argument.result_type() {
            Type::Flags(flags) => flags.clone(),
            other => {
                return Err(Error::validation_field(
                    format!("Flags mapper argument must be a flags type but is {}", other),
                    "argument",
                ))
            }
        };

        Ok(Self {
            index: vec![None; flags.len()],
            argument,
            flags,
            fallbacks: Fallbacks::default(),
            order: MapperOrder::Internal,
            algorithm: CombiningAlgorithm::FirstApplicable,
        })
    }

    /// Child evaluated when no child matches.
    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.fallbacks.default = Some(Slot::new(id));
        self
    }

    /// Child evaluated when the argument can't be calculated.
    pub fn with_error(mut self, id: impl Into<String>) -> Self {
        self.fallbacks.error = Some(Slot::new(id));
        self
    }

    /// Set the order of selected children.
    pub fn with_order(mut self, order: MapperOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the algorithm combining selected children.
    pub fn with_algorithm(mut self, algorithm: CombiningAlgorithm) -> Result<Self> {
        check_plain(&algorithm)?;
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Dispatch argument.
    pub fn argument(&self) -> &Expression {
        &self.argument
    }

    /// Flags type of the argument.
    pub fn flags(&self) -> &FlagsType {
        &self.flags
    }

    /// Order of selected children.
    pub fn order(&self) -> MapperOrder {
        self.order
    }

    /// Id of the default child.
    pub fn default_id(&self) -> Option<&str> {
        self.fallbacks.default.as_ref().map(|s| s.id.as_str())
    }

    /// Id of the error child.
    pub fn error_id(&self) -> Option<&str> {
        self.fallbacks.error.as_ref().map(|s| s.id.as_str())
    }

    pub(crate) fn bind<T: Combinable>(&self, children: &[T]) -> Result<Self> {
        let mut index = vec![None; self.flags.len()];
        for (i, child) in children.iter().enumerate() {
            let Some(id) = child.id() else {
                continue;
            };

            match self.flags.index_of(id) {
                Some(bit) => index[bit] = Some(i),
                None if self.fallbacks.is_fallback(id) => {}
                None => {
                    return Err(Error::UnknownFlag {
                        flags_type: self.flags.name().to_string(),
                        flag: id.to_string(),
                    })
                }
            }
        }

        Ok(Self {
            index,
            fallbacks: self.fallbacks.bind(children),
            ..self.clone()
        })
    }

    pub(crate) fn forget(&self, id: &str) -> Self {
        let mut index = self.index.clone();
        if let Some(bit) = self.flags.index_of(id) {
            index[bit] = None;
        }

        Self {
            index,
            fallbacks: self.fallbacks.forget(id),
            ..self.clone()
        }
    }

    pub(crate) fn execute<T: Combinable>(&self, children: &[T], ctx: &Context) -> Response {
        let mask = match self.argument.calculate(ctx).and_then(|v| v.as_flags_mask()) {
            Ok(mask) => mask,
            Err(e) => return self.fallbacks.on_error(children, ctx, e),
        };

        let mut selected: Vec<(&str, usize)> = self
            .flags
            .flags()
            .iter()
            .zip(&self.index)
            .enumerate()
            .filter(|(bit, _)| mask & (1u64 << bit) != 0)
            .filter_map(|(_, (name, i))| i.map(|i| (name.as_str(), i)))
            .collect();

        if selected.is_empty() {
            return self.fallbacks.on_default(children, ctx);
        }

        if self.order == MapperOrder::Internal {
            selected.sort_by_key(|(name, _)| *name);
        }

        let selected: Vec<usize> = selected.into_iter().map(|(_, i)| i).collect();
        combine(&self.algorithm, children, &selected, ctx)
    }
}

impl From<FlagsMapperAlgorithm> for CombiningAlgorithm {
    fn from(m: FlagsMapperAlgorithm) -> Self {
        CombiningAlgorithm::FlagsMapper(Box::new(m))
    }
}
