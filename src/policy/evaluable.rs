//! Policies, policy sets and structural modification of policy trees.
//!
//! Trees are immutable. [`Evaluable::append`] and [`Evaluable::delete`]
//! return a new tree which shares every untouched subtree with the old one.

use super::algorithm::{Combinable, CombiningAlgorithm};
use super::{Effect, Response, Rule, Target, TargetResult};
use crate::core::{AttributeAssignment, Context};
use crate::{Error, Result};

use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Child of a policy or policy set with a position in its parent.
trait Node: Combinable + Clone {
    fn ord(&self) -> usize;

    fn set_ord(&mut self, ord: usize);
}

impl Combinable for Rule {
    fn id(&self) -> Option<&str> {
        Rule::id(self)
    }

    fn evaluate(&self, ctx: &Context) -> Response {
        Rule::evaluate(self, ctx)
    }
}

impl Node for Rule {
    fn ord(&self) -> usize {
        Rule::ord(self)
    }

    fn set_ord(&mut self, ord: usize) {
        Rule::set_ord(self, ord)
    }
}

impl Combinable for Evaluable {
    fn id(&self) -> Option<&str> {
        Evaluable::id(self)
    }

    fn evaluate(&self, ctx: &Context) -> Response {
        Evaluable::evaluate(self, ctx)
    }
}

impl Node for Evaluable {
    fn ord(&self) -> usize {
        Evaluable::ord(self)
    }

    fn set_ord(&mut self, ord: usize) {
        match self {
            Evaluable::Policy(p) => p.ord = ord,
            Evaluable::PolicySet(s) => s.ord = ord,
        }
    }
}

fn check_id(id: &Option<String>, kind: &str) -> Result<()> {
    match id {
        Some(id) if id.is_empty() => Err(Error::validation_field(
            format!("{} ID cannot be empty", kind),
            "id",
        )),
        _ => Ok(()),
    }
}

fn check_duplicates<T: Combinable>(children: &[T]) -> Result<()> {
    let mut seen = HashSet::new();
    for id in children.iter().filter_map(Combinable::id) {
        if !seen.insert(id) {
            return Err(Error::DuplicateChild { id: id.to_string() });
        }
    }
    Ok(())
}

fn with_ords<T: Node>(children: Vec<T>) -> Vec<Arc<T>> {
    children
        .into_iter()
        .enumerate()
        .map(|(i, mut child)| {
            child.set_ord(i);
            Arc::new(child)
        })
        .collect()
}

/// Put a child in place of a same-id one or after the last child.
fn put_child<T: Node>(children: &[Arc<T>], mut child: T) -> Vec<Arc<T>> {
    let mut out = children.to_vec();
    let position = child
        .id()
        .and_then(|id| children.iter().position(|c| c.id() == Some(id)));

    match position {
        Some(k) => {
            child.set_ord(k);
            out[k] = Arc::new(child);
        }
        None => {
            child.set_ord(out.len());
            out.push(Arc::new(child));
        }
    }
    out
}

/// Remove a child by id, keeping ords contiguous.
fn remove_child<T: Node>(children: &[Arc<T>], id: &str) -> Option<Vec<Arc<T>>> {
    let k = children.iter().position(|c| c.id() == Some(id))?;
    Some(
        children
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != k)
            .map(|(_, c)| c.clone())
            .enumerate()
            .map(|(i, c)| {
                if c.ord() == i {
                    c
                } else {
                    let mut moved = (*c).clone();
                    moved.set_ord(i);
                    Arc::new(moved)
                }
            })
            .collect(),
    )
}

fn missing_child(parent: &Option<String>, id: &str) -> Error {
    Error::MissingChild {
        parent: parent.clone().unwrap_or_default(),
        id: id.to_string(),
    }
}

/// Common evaluation of policies and policy sets.
fn evaluate_node<T: Combinable>(
    id: Option<&str>,
    target: &Target,
    algorithm: &CombiningAlgorithm,
    children: &[T],
    obligations: &[AttributeAssignment],
    ctx: &Context,
) -> Response {
    let bind = |e: Error| match id {
        Some(id) => e.bind(id),
        None => e,
    };

    match target.evaluate(ctx) {
        TargetResult::Match => {}
        TargetResult::NoMatch => return Response::not_applicable(),
        TargetResult::Indeterminate(e) => {
            return if algorithm.propagates(&e) {
                Response::indeterminate(Effect::Indeterminate, bind(e))
            } else {
                Response::not_applicable().with_status(bind(e))
            };
        }
    }

    let mut r = algorithm.execute(children, ctx);
    if r.effect.is_decisive() {
        r.obligations.extend(obligations.iter().cloned());
    }
    r.status = r.status.map(bind);
    r
}

/// Policy: rules combined by a rule combining algorithm.
#[derive(Debug, Clone)]
pub struct Policy {
    ord: usize,
    id: Option<String>,
    target: Target,
    rules: Vec<Arc<Rule>>,
    algorithm: CombiningAlgorithm,
    obligations: Vec<AttributeAssignment>,
}

impl Policy {
    /// Create a policy builder.
    pub fn builder(id: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Create a builder of a policy without id.
    pub fn hidden() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Policy id, `None` for hidden policies.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Position within the parent policy set.
    pub fn ord(&self) -> usize {
        self.ord
    }

    /// Policy target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Rules in order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Rule combining algorithm.
    pub fn algorithm(&self) -> &CombiningAlgorithm {
        &self.algorithm
    }

    /// Policy obligations.
    pub fn obligations(&self) -> &[AttributeAssignment] {
        &self.obligations
    }

    /// Evaluate the policy.
    pub fn evaluate(&self, ctx: &Context) -> Response {
        let r = evaluate_node(
            self.id(),
            &self.target,
            &self.algorithm,
            &self.rules,
            &self.obligations,
            ctx,
        );
        trace!(policy = ?self.id, effect = %r.effect, "Evaluated policy");
        r
    }

    /// Error for a path going below a rule.
    fn through_rule(&self, id: &str) -> Error {
        if self.rules.iter().any(|r| r.id() == Some(id)) {
            Error::invalid_item(format!("Rule {} can't have children", id))
        } else {
            missing_child(&self.id, id)
        }
    }

    fn append(&self, path: &[String], item: PolicyItem) -> Result<Self> {
        if let Some(id) = path.first() {
            return Err(self.through_rule(id));
        }

        let rule = match item {
            PolicyItem::Rule(rule) => rule,
            other => {
                return Err(Error::invalid_item(format!(
                    "Can't append {} to policy",
                    other.kind()
                )))
            }
        };

        if rule.id().is_none() {
            return Err(Error::HiddenItem { kind: "rule" });
        }
        rule.validate()?;

        let rules = put_child(&self.rules, rule);
        Ok(Self {
            algorithm: self.algorithm.bind(&rules)?,
            rules,
            ..self.clone()
        })
    }

    fn delete(&self, path: &[String]) -> Result<Self> {
        match path {
            [] => Err(Error::PathTooShort),
            [id] => {
                let rules =
                    remove_child(&self.rules, id).ok_or_else(|| missing_child(&self.id, id))?;
                Ok(Self {
                    algorithm: self.algorithm.forget(id).bind(&rules)?,
                    rules,
                    ..self.clone()
                })
            }
            [id, ..] => Err(self.through_rule(id)),
        }
    }
}

/// Builder for policies.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    id: Option<String>,
    target: Target,
    rules: Vec<Rule>,
    algorithm: CombiningAlgorithm,
    obligations: Vec<AttributeAssignment>,
}

impl PolicyBuilder {
    /// Set the target.
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Add a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add several rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Set the rule combining algorithm.
    pub fn algorithm(mut self, algorithm: impl Into<CombiningAlgorithm>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Add an obligation.
    pub fn obligation(mut self, obligation: AttributeAssignment) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Validate and build the policy.
    pub fn build(self) -> Result<Policy> {
        check_id(&self.id, "Policy")?;
        self.target.validate()?;
        for rule in &self.rules {
            rule.validate().map_err(|e| match rule.id() {
                Some(id) => e.bind(id),
                None => e,
            })?;
        }
        check_duplicates(&self.rules)?;

        let rules = with_ords(self.rules);
        Ok(Policy {
            ord: 0,
            id: self.id,
            target: self.target,
            algorithm: self.algorithm.bind(&rules)?,
            rules,
            obligations: self.obligations,
        })
    }
}

/// Policy set: policies and policy sets combined by a policy combining
/// algorithm.
#[derive(Debug, Clone)]
pub struct PolicySet {
    ord: usize,
    id: Option<String>,
    target: Target,
    policies: Vec<Arc<Evaluable>>,
    algorithm: CombiningAlgorithm,
    obligations: Vec<AttributeAssignment>,
}

impl PolicySet {
    /// Create a policy set builder.
    pub fn builder(id: impl Into<String>) -> PolicySetBuilder {
        PolicySetBuilder {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Create a builder of a policy set without id.
    pub fn hidden() -> PolicySetBuilder {
        PolicySetBuilder::default()
    }

    /// Policy set id, `None` for hidden policy sets.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Position within the parent policy set.
    pub fn ord(&self) -> usize {
        self.ord
    }

    /// Policy set target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Children in order.
    pub fn policies(&self) -> &[Arc<Evaluable>] {
        &self.policies
    }

    /// Policy combining algorithm.
    pub fn algorithm(&self) -> &CombiningAlgorithm {
        &self.algorithm
    }

    /// Policy set obligations.
    pub fn obligations(&self) -> &[AttributeAssignment] {
        &self.obligations
    }

    /// Evaluate the policy set.
    pub fn evaluate(&self, ctx: &Context) -> Response {
        let r = evaluate_node(
            self.id(),
            &self.target,
            &self.algorithm,
            &self.policies,
            &self.obligations,
            ctx,
        );
        trace!(policy_set = ?self.id, effect = %r.effect, "Evaluated policy set");
        r
    }

    fn child(&self, id: &str) -> Result<&Arc<Evaluable>> {
        self.policies
            .iter()
            .find(|p| p.id() == Some(id))
            .ok_or_else(|| missing_child(&self.id, id))
    }

    fn replace(&self, child: Evaluable) -> Self {
        Self {
            policies: put_child(&self.policies, child),
            ..self.clone()
        }
    }

    fn append(&self, path: &[String], item: PolicyItem) -> Result<Self> {
        if let Some((id, rest)) = path.split_first() {
            let child = self.child(id)?.append(rest, item)?;
            return Ok(self.replace(child));
        }

        let child = match item {
            PolicyItem::Rule(rule) => {
                return Err(Error::invalid_item(format!(
                    "Can't append rule {} to policy set",
                    rule.id().unwrap_or_default()
                )))
            }
            PolicyItem::Policy(p) => Evaluable::Policy(p),
            PolicyItem::PolicySet(s) => Evaluable::PolicySet(s),
        };

        if child.id().is_none() {
            return Err(Error::HiddenItem { kind: child.kind() });
        }

        let policies = put_child(&self.policies, child);
        Ok(Self {
            algorithm: self.algorithm.bind(&policies)?,
            policies,
            ..self.clone()
        })
    }

    fn delete(&self, path: &[String]) -> Result<Self> {
        match path {
            [] => Err(Error::PathTooShort),
            [id] => {
                let policies = remove_child(&self.policies, id)
                    .ok_or_else(|| missing_child(&self.id, id))?;
                Ok(Self {
                    algorithm: self.algorithm.forget(id).bind(&policies)?,
                    policies,
                    ..self.clone()
                })
            }
            [id, rest @ ..] => {
                let child = self.child(id)?.delete(rest)?;
                Ok(self.replace(child))
            }
        }
    }
}

impl Default for PolicySet {
    /// Hidden policy set without children.
    fn default() -> Self {
        Self {
            ord: 0,
            id: None,
            target: Target::Always,
            policies: Vec::new(),
            algorithm: CombiningAlgorithm::FirstApplicable,
            obligations: Vec::new(),
        }
    }
}

/// Builder for policy sets.
#[derive(Debug, Default)]
pub struct PolicySetBuilder {
    id: Option<String>,
    target: Target,
    policies: Vec<Evaluable>,
    algorithm: CombiningAlgorithm,
    obligations: Vec<AttributeAssignment>,
}

impl PolicySetBuilder {
    /// Set the target.
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Add a policy or policy set.
    pub fn child(mut self, child: impl Into<Evaluable>) -> Self {
        self.policies.push(child.into());
        self
    }

    /// Set the policy combining algorithm.
    pub fn algorithm(mut self, algorithm: impl Into<CombiningAlgorithm>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Add an obligation.
    pub fn obligation(mut self, obligation: AttributeAssignment) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Validate and build the policy set.
    pub fn build(self) -> Result<PolicySet> {
        check_id(&self.id, "Policy set")?;
        self.target.validate()?;
        check_duplicates(&self.policies)?;

        let policies = with_ords(self.policies);
        Ok(PolicySet {
            ord: 0,
            id: self.id,
            target: self.target,
            algorithm: self.algorithm.bind(&policies)?,
            policies,
            obligations: self.obligations,
        })
    }
}

/// Root or inner node of a policy tree.
#[derive(Debug, Clone)]
pub enum Evaluable {
    /// A policy
    Policy(Policy),
    /// A policy set
    PolicySet(PolicySet),
}

impl From<Policy> for Evaluable {
    fn from(p: Policy) -> Self {
        Evaluable::Policy(p)
    }
}

impl From<PolicySet> for Evaluable {
    fn from(s: PolicySet) -> Self {
        Evaluable::PolicySet(s)
    }
}

impl Evaluable {
    /// Node id, `None` for hidden nodes.
    pub fn id(&self) -> Option<&str> {
        match self {
            Evaluable::Policy(p) => p.id(),
            Evaluable::PolicySet(s) => s.id(),
        }
    }

    /// Position within the parent policy set.
    pub fn ord(&self) -> usize {
        match self {
            Evaluable::Policy(p) => p.ord,
            Evaluable::PolicySet(s) => s.ord,
        }
    }

    /// Kind of node.
    pub fn kind(&self) -> &'static str {
        match self {
            Evaluable::Policy(_) => "policy",
            Evaluable::PolicySet(_) => "policy set",
        }
    }

    /// Combining algorithm of the node.
    pub fn algorithm(&self) -> &CombiningAlgorithm {
        match self {
            Evaluable::Policy(p) => p.algorithm(),
            Evaluable::PolicySet(s) => s.algorithm(),
        }
    }

    /// The policy, if this node is one.
    pub fn as_policy(&self) -> Option<&Policy> {
        match self {
            Evaluable::Policy(p) => Some(p),
            _ => None,
        }
    }

    /// The policy set, if this node is one.
    pub fn as_policy_set(&self) -> Option<&PolicySet> {
        match self {
            Evaluable::PolicySet(s) => Some(s),
            _ => None,
        }
    }

    /// Evaluate the node.
    pub fn evaluate(&self, ctx: &Context) -> Response {
        match self {
            Evaluable::Policy(p) => p.evaluate(ctx),
            Evaluable::PolicySet(s) => s.evaluate(ctx),
        }
    }

    /// Add or replace an item below the node.
    ///
    /// `path` holds the ids of the nodes leading to the parent of the item,
    /// not including this node. An empty path makes the item a direct
    /// child. An item replacing a child with the same id takes its
    /// position; a new item goes last.
    pub fn append(&self, path: &[String], item: PolicyItem) -> Result<Evaluable> {
        if self.id().is_none() {
            return Err(Error::HiddenNode { kind: self.kind() });
        }

        Ok(match self {
            Evaluable::Policy(p) => Evaluable::Policy(p.append(path, item)?),
            Evaluable::PolicySet(s) => Evaluable::PolicySet(s.append(path, item)?),
        })
    }

    /// Remove the item at `path` below the node.
    ///
    /// The last path element is the id of the item to remove.
    pub fn delete(&self, path: &[String]) -> Result<Evaluable> {
        if self.id().is_none() {
            return Err(Error::HiddenNode { kind: self.kind() });
        }

        Ok(match self {
            Evaluable::Policy(p) => Evaluable::Policy(p.delete(path)?),
            Evaluable::PolicySet(s) => Evaluable::PolicySet(s.delete(path)?),
        })
    }
}

/// Item added to a policy tree.
#[derive(Debug, Clone)]
pub enum PolicyItem {
    /// Rule for a policy
    Rule(Rule),
    /// Policy for a policy set
    Policy(Policy),
    /// Policy set for a policy set
    PolicySet(PolicySet),
}

impl PolicyItem {
    /// Kind of item.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyItem::Rule(_) => "rule",
            PolicyItem::Policy(_) => "policy",
            PolicyItem::PolicySet(_) => "policy set",
        }
    }
}

impl From<Rule> for PolicyItem {
    fn from(r: Rule) -> Self {
        PolicyItem::Rule(r)
    }
}

impl From<Policy> for PolicyItem {
    fn from(p: Policy) -> Self {
        PolicyItem::Policy(p)
    }
}

impl From<PolicySet> for PolicyItem {
    fn from(s: PolicySet) -> Self {
        PolicyItem::PolicySet(s)
    }
}
