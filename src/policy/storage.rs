//! Versioned policy storage.
//!
//! A storage pairs the root of a policy tree with an optional tag. Tagged
//! storages accept updates through transactions that start from the
//! current tag; commands address nodes by paths starting with the root id.

use super::{Evaluable, PolicyItem, PolicySet, Response};
use crate::core::Context;
use crate::{Error, Result};

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Policy tree with its version tag.
#[derive(Debug, Clone)]
pub struct PolicyStorage {
    root: Arc<Evaluable>,
    tag: Option<Uuid>,
}

impl PolicyStorage {
    /// Create a storage holding the given root.
    pub fn new(root: impl Into<Evaluable>, tag: Option<Uuid>) -> Self {
        Self {
            root: Arc::new(root.into()),
            tag,
        }
    }

    /// Root of the policy tree.
    pub fn root(&self) -> &Evaluable {
        &self.root
    }

    /// Current tag.
    pub fn tag(&self) -> Option<Uuid> {
        self.tag
    }

    /// Evaluate the tree against a context.
    pub fn evaluate(&self, ctx: &Context) -> Response {
        self.root.evaluate(ctx)
    }

    /// Start a transaction from the given tag.
    pub fn new_transaction(&self, tag: Uuid) -> Result<PolicyTransaction> {
        self.check_tag(tag)?;
        Ok(PolicyTransaction {
            base_tag: tag,
            storage: self.clone(),
            failure: None,
        })
    }

    fn check_tag(&self, tag: Uuid) -> Result<()> {
        let current = self.tag.ok_or_else(|| Error::MissingTag {
            id: self.root.id().unwrap_or_default().to_string(),
        })?;
        if current != tag {
            return Err(Error::TagMismatch {
                expected: current.to_string(),
                actual: tag.to_string(),
            });
        }
        Ok(())
    }

    /// Strip the root id from a command path.
    fn relative<'a>(&self, path: &'a [String]) -> Result<&'a [String]> {
        let (first, rest) = path.split_first().ok_or(Error::PathTooShort)?;
        match self.root.id() {
            Some(id) if id == first.as_str() => Ok(rest),
            expected => Err(Error::InvalidRootId {
                expected: expected.map(str::to_string),
                actual: first.clone(),
            }),
        }
    }

    fn apply_command(&self, command: &PolicyCommand) -> Result<Evaluable> {
        match command {
            PolicyCommand::Add { path, item } => {
                self.root.append(self.relative(path)?, item.clone())
            }
            PolicyCommand::Delete { path } => self.root.delete(self.relative(path)?),
        }
    }
}

impl Default for PolicyStorage {
    /// Untagged storage with an empty hidden root.
    fn default() -> Self {
        Self::new(PolicySet::default(), None)
    }
}

/// One command of a policy update.
#[derive(Debug, Clone)]
pub enum PolicyCommand {
    /// Add or replace an item under the node at `path`
    Add {
        /// Ids from the root to the parent of the item
        path: Vec<String>,
        /// Item to add
        item: PolicyItem,
    },
    /// Delete the item at `path`
    Delete {
        /// Ids from the root to the item
        path: Vec<String>,
    },
}

impl fmt::Display for PolicyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyCommand::Add { path, item } => {
                write!(f, "add {} to {}", item.kind(), path.join("/"))
            }
            PolicyCommand::Delete { path } => write!(f, "delete {}", path.join("/")),
        }
    }
}

/// Ordered list of commands moving policies from one tag to another.
#[derive(Debug, Clone)]
pub struct PolicyUpdate {
    old_tag: Uuid,
    new_tag: Uuid,
    commands: Vec<PolicyCommand>,
}

impl PolicyUpdate {
    /// Create an empty update.
    pub fn new(old_tag: Uuid, new_tag: Uuid) -> Self {
        Self {
            old_tag,
            new_tag,
            commands: Vec::new(),
        }
    }

    /// Append an add command.
    pub fn add<P, S>(mut self, path: P, item: impl Into<PolicyItem>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(PolicyCommand::Add {
            path: path.into_iter().map(Into::into).collect(),
            item: item.into(),
        });
        self
    }

    /// Append a delete command.
    pub fn delete<P, S>(mut self, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(PolicyCommand::Delete {
            path: path.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Tag the update applies to.
    pub fn old_tag(&self) -> Uuid {
        self.old_tag
    }

    /// Tag of the policies after the update.
    pub fn new_tag(&self) -> Uuid {
        self.new_tag
    }

    /// Commands in application order.
    pub fn commands(&self) -> &[PolicyCommand] {
        &self.commands
    }
}

/// Working copy of a policy storage collecting updates until commit.
///
/// Like content transactions, a failed update poisons the transaction.
#[derive(Debug)]
pub struct PolicyTransaction {
    base_tag: Uuid,
    storage: PolicyStorage,
    failure: Option<String>,
}

impl PolicyTransaction {
    /// Current tag of the working copy.
    pub fn tag(&self) -> Option<Uuid> {
        self.storage.tag
    }

    /// Check if an update has failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(Error::FailedTransaction {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Apply an update to the working copy.
    pub fn apply(&mut self, update: &PolicyUpdate) -> Result<()> {
        self.check()?;

        match self.try_apply(update) {
            Ok(storage) => {
                debug!(
                    commands = update.commands().len(),
                    tag = %update.new_tag(),
                    "Applied policy update"
                );
                self.storage = storage;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Policy update failed");
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn try_apply(&self, update: &PolicyUpdate) -> Result<PolicyStorage> {
        self.storage.check_tag(update.old_tag())?;

        let mut storage = self.storage.clone();
        for command in update.commands() {
            debug!(%command, "Applying policy command");
            storage.root = Arc::new(storage.apply_command(command)?);
        }
        storage.tag = Some(update.new_tag());
        Ok(storage)
    }

    /// Publish the working copy.
    ///
    /// The storage must still have the tag the transaction started from.
    pub fn commit(self, storage: &PolicyStorage) -> Result<PolicyStorage> {
        self.check()?;
        storage.check_tag(self.base_tag)?;

        debug!(tag = ?self.storage.tag, "Committed policy transaction");
        Ok(self.storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, Policy, PolicySet, Rule};

    fn storage(tag: Option<Uuid>) -> PolicyStorage {
        let policy = Policy::builder("p").rule(Rule::deny("r1")).build().unwrap();
        let root = PolicySet::builder("root").child(policy).build().unwrap();
        PolicyStorage::new(root, tag)
    }

    fn rule_count(s: &PolicyStorage) -> usize {
        s.root().as_policy_set().unwrap().policies()[0]
            .as_policy()
            .unwrap()
            .rules()
            .len()
    }

    #[test]
    fn test_transaction_commit() {
        let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());
        let s = storage(Some(t1));

        let mut tx = s.new_transaction(t1).unwrap();
        tx.apply(
            &PolicyUpdate::new(t1, t2)
                .add(["root", "p"], Rule::permit("r2"))
                .delete(["root", "p", "r1"]),
        )
        .unwrap();
        assert_eq!(tx.tag(), Some(t2));

        let updated = tx.commit(&s).unwrap();
        assert_eq!(updated.tag(), Some(t2));
        assert_eq!(rule_count(&updated), 1);
        assert_eq!(updated.evaluate(&Context::default()).effect, Effect::Permit);

        assert_eq!(s.tag(), Some(t1));
        assert_eq!(s.evaluate(&Context::default()).effect, Effect::Deny);
    }

    #[test]
    fn test_tags() {
        let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(matches!(
            storage(None).new_transaction(t1),
            Err(Error::MissingTag { .. })
        ));
        assert!(matches!(
            storage(Some(t1)).new_transaction(t2),
            Err(Error::TagMismatch { .. })
        ));

        let s = storage(Some(t1));
        let mut tx = s.new_transaction(t1).unwrap();
        tx.apply(&PolicyUpdate::new(t1, t2).delete(["root", "p"])).unwrap();

        let concurrent = storage(Some(Uuid::new_v4()));
        assert!(matches!(tx.commit(&concurrent), Err(Error::TagMismatch { .. })));
    }

    #[test]
    fn test_failed_update_poisons_transaction() {
        let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());
        let s = storage(Some(t1));

        let mut tx = s.new_transaction(t1).unwrap();
        let err = tx
            .apply(&PolicyUpdate::new(t1, t2).add(["other", "p"], Rule::permit("r2")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRootId { ref actual, .. } if actual == "other"));
        assert!(tx.is_failed());

        let retry = tx.apply(&PolicyUpdate::new(t1, t2).add(["root", "p"], Rule::permit("r2")));
        assert!(matches!(retry, Err(Error::FailedTransaction { .. })));
        assert!(matches!(tx.commit(&s), Err(Error::FailedTransaction { .. })));
    }

    #[test]
    fn test_update_chain() {
        let (t1, t2, t3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let s = storage(Some(t1));

        let mut tx = s.new_transaction(t1).unwrap();
        tx.apply(&PolicyUpdate::new(t1, t2).add(["root", "p"], Rule::permit("r2")))
            .unwrap();
        tx.apply(&PolicyUpdate::new(t2, t3).add(["root", "p"], Rule::permit("r3")))
            .unwrap();

        assert!(matches!(
            tx.apply(&PolicyUpdate::new(t1, t3)),
            Err(Error::TagMismatch { .. })
        ));
        assert!(tx.is_failed());
    }

    #[test]
    fn test_path_checks() {
        let s = storage(None);
        let err = s.apply_command(&PolicyCommand::Delete { path: vec![] }).unwrap_err();
        assert!(matches!(err, Error::PathTooShort));

        let err = s
            .apply_command(&PolicyCommand::Delete {
                path: vec!["root".to_string()],
            })
            .unwrap_err();
        assert!(matches!(err, Error::PathTooShort));
    }
}
