//! Client store - the client's cached items and pending changes.
//!
//! The store holds the last confirmed checkpoint, the cached value of every
//! known item and the change lists not yet confirmed by the server. It is
//! serializable so an application can persist it between sessions.

use crate::{ChangeList, ClientDataItem, ItemId, ItemValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStore {
    /// Server time up to which this client has seen every mutation
    timestamp: Timestamp,
    /// Cached items by id
    items: BTreeMap<ItemId, ClientDataItem>,
    /// Unconfirmed local changes by item id
    change_lists: BTreeMap<ItemId, ChangeList>,
}

impl ClientStore {
    /// Create an empty store with checkpoint 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last confirmed checkpoint.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Get a cached item.
    pub fn get(&self, id: &str) -> Option<&ClientDataItem> {
        self.items.get(id)
    }

    /// Get the cached value of an item.
    pub fn value(&self, id: &str) -> Option<&ItemValue> {
        self.items.get(id).map(|item| &item.value)
    }

    /// All cached items.
    pub fn items(&self) -> impl Iterator<Item = &ClientDataItem> {
        self.items.values()
    }

    /// Get the pending change list of an item.
    pub fn pending(&self, id: &str) -> Option<&ChangeList> {
        self.change_lists.get(id)
    }

    /// All pending change lists.
    pub fn change_lists(&self) -> &BTreeMap<ItemId, ChangeList> {
        &self.change_lists
    }

    /// Number of items with pending changes.
    pub fn pending_count(&self) -> usize {
        self.change_lists.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.change_lists.is_empty()
    }

    pub(crate) fn insert_item(&mut self, item: ClientDataItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub(crate) fn insert_change_list(&mut self, id: ItemId, list: ChangeList) {
        self.change_lists.insert(id, list);
    }

    pub(crate) fn change_lists_mut(&mut self) -> impl Iterator<Item = &mut ChangeList> {
        self.change_lists.values_mut()
    }

    /// Drop every pending change list and move the checkpoint.
    pub(crate) fn confirm(&mut self, timestamp: Timestamp) {
        self.change_lists.clear();
        self.timestamp = timestamp;
    }
}
