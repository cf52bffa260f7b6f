//! Content updates and transactions.

use super::{check_tag, Content, ContentItem, ContentStorage};
use crate::core::AttributeValue;
use crate::{Error, Result};

use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Payload of an add command.
#[derive(Debug, Clone)]
pub enum ContentEntry {
    /// Whole item, added under its own id
    Item(ContentItem),
    /// Single value stored under a key path of an item
    Value(AttributeValue),
}

impl From<ContentItem> for ContentEntry {
    fn from(item: ContentItem) -> Self {
        ContentEntry::Item(item)
    }
}

impl From<AttributeValue> for ContentEntry {
    fn from(v: AttributeValue) -> Self {
        ContentEntry::Value(v)
    }
}

/// One command of a content update.
///
/// The path starts with an item id followed by keys of the item's levels.
#[derive(Debug, Clone)]
pub enum ContentCommand {
    /// Add or replace an item or a value
    Add {
        /// Item id and keys
        path: Vec<String>,
        /// Item or value to add
        entry: ContentEntry,
    },
    /// Delete an item or a subtree of an item
    Delete {
        /// Item id and keys
        path: Vec<String>,
    },
}

impl fmt::Display for ContentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCommand::Add { path, .. } => write!(f, "add {}", path.join("/")),
            ContentCommand::Delete { path } => write!(f, "delete {}", path.join("/")),
        }
    }
}

/// Ordered list of commands moving a content from one tag to another.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    content_id: String,
    old_tag: Uuid,
    new_tag: Uuid,
    commands: Vec<ContentCommand>,
}

impl ContentUpdate {
    /// Create an empty update.
    pub fn new(content_id: impl Into<String>, old_tag: Uuid, new_tag: Uuid) -> Self {
        Self {
            content_id: content_id.into(),
            old_tag,
            new_tag,
            commands: Vec::new(),
        }
    }

    /// Append an add command.
    pub fn add<P, S>(mut self, path: P, entry: impl Into<ContentEntry>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(ContentCommand::Add {
            path: path.into_iter().map(Into::into).collect(),
            entry: entry.into(),
        });
        self
    }

    /// Append a delete command.
    pub fn delete<P, S>(mut self, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(ContentCommand::Delete {
            path: path.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Id of the updated content.
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Tag the update applies to.
    pub fn old_tag(&self) -> Uuid {
        self.old_tag
    }

    /// Tag the content has after the update.
    pub fn new_tag(&self) -> Uuid {
        self.new_tag
    }

    /// Commands in application order.
    pub fn commands(&self) -> &[ContentCommand] {
        &self.commands
    }
}

/// Working copy of a content collecting updates until commit.
///
/// A failed update poisons the transaction; every later call fails with
/// [`Error::FailedTransaction`].
#[derive(Debug)]
pub struct ContentTransaction {
    base_tag: Uuid,
    content: Content,
    failure: Option<String>,
}

impl ContentTransaction {
    pub(super) fn new(content: Content, base_tag: Uuid) -> Self {
        Self {
            base_tag,
            content,
            failure: None,
        }
    }

    /// Id of the content under update.
    pub fn content_id(&self) -> &str {
        self.content.id()
    }

    /// Current tag of the working copy.
    pub fn tag(&self) -> Option<Uuid> {
        self.content.tag()
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
    pub fn apply(&mut self, update: &ContentUpdate) -> Result<()> {
        self.check()?;

        match self.try_apply(update) {
            Ok(content) => {
                debug!(
                    content = %update.content_id(),
                    commands = update.commands().len(),
                    tag = %update.new_tag(),
                    "Applied content update"
                );
                self.content = content;
                Ok(())
            }
            Err(e) => {
                warn!(content = %update.content_id(), error = %e, "Content update failed");
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn try_apply(&self, update: &ContentUpdate) -> Result<Content> {
        if update.content_id() != self.content.id() {
            return Err(Error::content_with_id(
                format!(
                    "update for {} applied to transaction on {}",
                    update.content_id(),
                    self.content.id()
                ),
                update.content_id(),
            ));
        }
        check_tag(&self.content, update.old_tag())?;

        let mut content = self.content.clone();
        for command in update.commands() {
            apply_command(&mut content, command).map_err(|e| {
                Error::content_with_id(format!("{}: {}", command, e), update.content_id())
            })?;
        }
        content.set_tag(Some(update.new_tag()));
        Ok(content)
    }

    /// Publish the working copy into a storage.
    ///
    /// The storage must still hold the content with the tag the transaction
    /// started from.
    pub fn commit(self, storage: &ContentStorage) -> Result<ContentStorage> {
        self.check()?;

        let current = storage.get(self.content.id()).ok_or_else(|| {
            Error::content_with_id(
                format!("no content {}", self.content.id()),
                self.content.id(),
            )
        })?;
        check_tag(current, self.base_tag)?;

        debug!(
            content = %self.content.id(),
            tag = ?self.content.tag(),
            "Committed content transaction"
        );
        Ok(storage.with(self.content))
    }
}

fn apply_command(content: &mut Content, command: &ContentCommand) -> Result<()> {
    match command {
        ContentCommand::Add { path, entry } => {
            let (item_id, keys) = path.split_first().ok_or(Error::PathTooShort)?;
            match entry {
                ContentEntry::Item(item) => {
                    if !keys.is_empty() {
                        return Err(Error::invalid_item("an item can only be added by its id"));
                    }
                    if item.id() != item_id.as_str() {
                        return Err(Error::invalid_item(format!(
                            "item {} added under id {}",
                            item.id(),
                            item_id
                        )));
                    }
                    content.insert_item(item.clone());
                }
                ContentEntry::Value(value) => {
                    let item = content.item(item_id).ok_or_else(|| Error::MissingChild {
                        parent: content.id().to_string(),
                        id: item_id.clone(),
                    })?;
                    if keys.len() != item.keys().len() {
                        return Err(Error::invalid_item(format!(
                            "item {} expects {} keys",
                            item_id,
                            item.keys().len()
                        )));
                    }
                    let keys = item.parse_keys(keys)?;
                    let item = item.insert(&keys, value.clone())?;
                    content.insert_item(item);
                }
            }
        }
        ContentCommand::Delete { path } => {
            let (item_id, keys) = path.split_first().ok_or(Error::PathTooShort)?;
            if keys.is_empty() {
                content.remove_item(item_id).ok_or_else(|| Error::MissingChild {
                    parent: content.id().to_string(),
                    id: item_id.clone(),
                })?;
            } else {
                let item = content.item(item_id).ok_or_else(|| Error::MissingChild {
                    parent: content.id().to_string(),
                    id: item_id.clone(),
                })?;
                let keys = item.parse_keys(keys)?;
                let item = item.remove(&keys)?;
                content.insert_item(item);
            }
        }
    }
    Ok(())
}
