//! Storage behind the server.
//!
//! The server only needs a key-value map of [`ServerDataItem`]s with one
//! extra guarantee: [`ServerStore::update`] runs its read-modify-write
//! exclusively for the given id, so concurrent requests touching the same
//! item serialize while unrelated items proceed in parallel.

use crate::{error::Result, ItemId, ServerDataItem, Timestamp};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Read-modify-write callback handed to [`ServerStore::update`].
///
/// Receives the current item (if any) and returns the item to store. An
/// error leaves the stored item untouched.
pub type ItemUpdate<'a> = dyn FnMut(Option<ServerDataItem>) -> Result<ServerDataItem> + 'a;

/// Authoritative item storage.
pub trait ServerStore: Send + Sync {
    /// Get a copy of an item.
    fn get(&self, id: &str) -> Option<ServerDataItem>;

    /// Atomically replace the item stored under `id` with the result of
    /// `update`.
    fn update(&self, id: &str, update: &mut ItemUpdate<'_>) -> Result<()>;

    /// Every item whose timestamp is strictly greater than `timestamp`.
    fn changed_since(&self, timestamp: Timestamp) -> Vec<ServerDataItem>;

    /// Number of stored items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store sharded by item id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<ItemId, ServerDataItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }
}

impl ServerStore for MemoryStore {
    fn get(&self, id: &str) -> Option<ServerDataItem> {
        self.items.get(id).map(|item| item.value().clone())
    }

    fn update(&self, id: &str, update: &mut ItemUpdate<'_>) -> Result<()> {
        // The entry holds the shard lock until it is dropped.
        match self.items.entry(id.to_owned()) {
            Entry::Occupied(mut entry) => {
                let next = update(Some(entry.get().clone()))?;
                entry.insert(next);
            }
            Entry::Vacant(entry) => {
                let next = update(None)?;
                entry.insert(next);
            }
        }
        Ok(())
    }

    fn changed_since(&self, timestamp: Timestamp) -> Vec<ServerDataItem> {
        self.items
            .iter()
            .filter(|item| item.timestamp > timestamp)
            .map(|item| item.value().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
