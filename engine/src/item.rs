//! Item types held by the client and the server.

use crate::{DataType, Element, ItemId, OperationId, SetOperation, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A client-facing item value, tagged with its data type.
///
/// Serialized as `{"type": "<tag>", "value": <payload>}` so a decoder
/// always lands on the variant matching the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ItemValue {
    Value(serde_json::Value),
    Increment(f64),
    Set(Vec<Element>),
}

impl ItemValue {
    /// The value a freshly seen item starts from.
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Value => ItemValue::Value(serde_json::Value::Null),
            DataType::Increment => ItemValue::Increment(0.0),
            DataType::Set => ItemValue::Set(Vec::new()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ItemValue::Value(_) => DataType::Value,
            ItemValue::Increment(_) => DataType::Increment,
            ItemValue::Set(_) => DataType::Set,
        }
    }
}

/// The client's cached view of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDataItem {
    pub id: ItemId,
    pub value: ItemValue,
}

impl ClientDataItem {
    /// Create an item holding the empty value of its data type.
    pub fn new(id: impl Into<ItemId>, data_type: DataType) -> Self {
        Self::with_value(id, ItemValue::empty(data_type))
    }

    pub fn with_value(id: impl Into<ItemId>, value: ItemValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

/// Latest operation the server has seen for one set element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOperation {
    pub operation: SetOperation,
    /// Calibrated server time of the operation
    pub time: Timestamp,
}

/// Authoritative state of an item, including the bookkeeping its merge
/// strategy needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ServerState {
    Value {
        value: serde_json::Value,
        /// Calibrated time of the accepted write, `None` until first write
        last_modified_time: Option<Timestamp>,
    },
    Increment {
        total: f64,
        /// Every operation id already merged
        uids: BTreeSet<OperationId>,
    },
    Set {
        elements: BTreeMap<Element, ElementOperation>,
    },
}

impl ServerState {
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Value => ServerState::Value {
                value: serde_json::Value::Null,
                last_modified_time: None,
            },
            DataType::Increment => ServerState::Increment {
                total: 0.0,
                uids: BTreeSet::new(),
            },
            DataType::Set => ServerState::Set {
                elements: BTreeMap::new(),
            },
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ServerState::Value { .. } => DataType::Value,
            ServerState::Increment { .. } => DataType::Increment,
            ServerState::Set { .. } => DataType::Set,
        }
    }
}

/// An item in the server store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDataItem {
    pub id: ItemId,
    /// Server clock at the last mutation. Decides whether the item is echoed
    /// to a client whose checkpoint is older.
    pub timestamp: Timestamp,
    pub state: ServerState,
}

impl ServerDataItem {
    /// Create an empty item of the given type.
    pub fn new(id: impl Into<ItemId>, data_type: DataType, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            timestamp,
            state: ServerState::empty(data_type),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.state.data_type()
    }
}
