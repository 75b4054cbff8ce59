//! Shared-backend tables and change notifications.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::UnknownTable;
use crate::types::Keyed;

/// Logical tables of the shared backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Folders,
    Quotes,
    Attachments,
    ActiveUsers,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Folders,
        Table::Quotes,
        Table::Attachments,
        Table::ActiveUsers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Folders => "folders",
            Table::Quotes => "quotes",
            Table::Attachments => "attachments",
            Table::ActiveUsers => "active_users",
        }
    }

    /// Whether rows carry a server-managed `updated_at` column.
    pub fn tracks_updates(self) -> bool {
        !matches!(self, Table::Attachments)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

/// A single row change on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent<T> {
    Insert { new: T },
    Update { new: T, old: Option<T> },
    Delete { old: T },
}

impl<T> ChangeEvent<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert { .. } => "INSERT",
            ChangeEvent::Update { .. } => "UPDATE",
            ChangeEvent::Delete { .. } => "DELETE",
        }
    }
}

impl ChangeEvent<serde_json::Value> {
    /// Convert an untyped notification into a typed one.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ChangeEvent<T>, serde_json::Error> {
        Ok(match self {
            ChangeEvent::Insert { new } => ChangeEvent::Insert {
                new: serde_json::from_value(new)?,
            },
            ChangeEvent::Update { new, old } => ChangeEvent::Update {
                new: serde_json::from_value(new)?,
                old: old.map(serde_json::from_value).transpose()?,
            },
            ChangeEvent::Delete { old } => ChangeEvent::Delete {
                old: serde_json::from_value(old)?,
            },
        })
    }
}

impl<T: Keyed> ChangeEvent<T> {
    /// Reconcile a local view with this change: inserts go to the front,
    /// updates replace the record with the same key, deletes remove it.
    pub fn apply(self, view: &mut Vec<T>) {
        match self {
            ChangeEvent::Insert { new } => view.insert(0, new),
            ChangeEvent::Update { new, .. } => {
                if let Some(slot) = view.iter_mut().find(|r| r.key() == new.key()) {
                    *slot = new;
                }
            }
            ChangeEvent::Delete { old } => view.retain(|r| r.key() != old.key()),
        }
    }
}
