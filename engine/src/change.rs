//! Change types for expressing local edits.
//!
//! A client never sends its current values to the server. It sends the
//! changes it made, grouped per item into a [`ChangeList`] whose variant
//! fixes the [`DataType`] of every change it holds.

use crate::{Element, OperationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The merge semantics attached to an item.
///
/// Immutable for the lifetime of an item id once first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Scalar value, last write wins
    Value,
    /// Commutative numeric counter
    Increment,
    /// Unordered collection of numeric elements
    Set,
}

impl DataType {
    /// Every data type, in tag order.
    pub const ALL: [DataType; 3] = [DataType::Value, DataType::Increment, DataType::Set];

    /// Wire tag of this data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Value => "value",
            DataType::Increment => "increment",
            DataType::Set => "set",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Full replacement of a scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    /// Client clock reading when the edit was made
    pub last_modified_time: Timestamp,
    /// The new value
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "is_false")]
    pub synced: bool,
}

/// A delta added to a counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementChange {
    /// Globally unique operation id, used by the server to drop duplicates
    pub uid: OperationId,
    /// Amount to add (may be negative)
    pub increment: f64,
    /// Set once the change went out in a request. A synced change is never
    /// coalesced with later local increments.
    #[serde(default, skip_serializing_if = "is_false")]
    pub synced: bool,
}

/// Whether a set element is being added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOperation {
    Add,
    Remove,
}

/// An element-level mutation of a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChange {
    pub element: Element,
    /// Client clock reading when the edit was made
    pub time: Timestamp,
    pub operation: SetOperation,
    #[serde(default, skip_serializing_if = "is_false")]
    pub synced: bool,
}

/// A single local edit of any data type.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Value(ValueChange),
    Increment(IncrementChange),
    Set(SetChange),
}

impl Change {
    /// Data type this change belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Change::Value(_) => DataType::Value,
            Change::Increment(_) => DataType::Increment,
            Change::Set(_) => DataType::Set,
        }
    }
}

impl ValueChange {
    /// Create a value change stamped with the client's clock.
    pub fn new(value: serde_json::Value, last_modified_time: Timestamp) -> Self {
        Self {
            last_modified_time,
            value,
            synced: false,
        }
    }
}

impl IncrementChange {
    /// Create an increment change with an explicit operation id.
    pub fn new(uid: impl Into<OperationId>, increment: f64) -> Self {
        Self {
            uid: uid.into(),
            increment,
            synced: false,
        }
    }

    /// Create an increment change with a fresh random operation id.
    pub fn with_random_uid(increment: f64) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), increment)
    }
}

impl SetChange {
    /// Create a set change stamped with the client's clock.
    pub fn new(element: Element, operation: SetOperation, time: Timestamp) -> Self {
        Self {
            element,
            time,
            operation,
            synced: false,
        }
    }
}

/// The pending, not yet confirmed changes of one item.
///
/// Homogeneous by construction: the variant is the list's data type.
/// Serialized as `{"type": "<tag>", "changes": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "changes", rename_all = "lowercase")]
pub enum ChangeList {
    Value(Vec<ValueChange>),
    Increment(Vec<IncrementChange>),
    Set(Vec<SetChange>),
}

impl ChangeList {
    /// Create an empty list for a data type.
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::Value => ChangeList::Value(Vec::new()),
            DataType::Increment => ChangeList::Increment(Vec::new()),
            DataType::Set => ChangeList::Set(Vec::new()),
        }
    }

    /// Data type shared by every change in the list.
    pub fn data_type(&self) -> DataType {
        match self {
            ChangeList::Value(_) => DataType::Value,
            ChangeList::Increment(_) => DataType::Increment,
            ChangeList::Set(_) => DataType::Set,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChangeList::Value(changes) => changes.len(),
            ChangeList::Increment(changes) => changes.len(),
            ChangeList::Set(changes) => changes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flag the trailing change as already transmitted.
    ///
    /// Returns false if the list is empty.
    pub fn mark_last_synced(&mut self) -> bool {
        let synced = match self {
            ChangeList::Value(changes) => changes.last_mut().map(|c| &mut c.synced),
            ChangeList::Increment(changes) => changes.last_mut().map(|c| &mut c.synced),
            ChangeList::Set(changes) => changes.last_mut().map(|c| &mut c.synced),
        };

        match synced {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }
}
