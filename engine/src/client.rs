//! Client - local edits and the client half of the sync cycle.

use crate::{
    error::Result, Change, ChangeList, ClientDataItem, ClientStore, Clock, DataType, Element,
    Error, IncrementChange, ItemId, ItemValue, Registry, SetChange, SetOperation, SyncRequest,
    SyncResponse, SystemClock, Timestamp, Transport, ValueChange,
};
use std::sync::Arc;

/// Outcome of one completed sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    /// Change lists sent to the server
    pub sent: usize,
    /// Item values adopted from the response
    pub received: usize,
    /// The new checkpoint
    pub timestamp: Timestamp,
}

/// An offline-first client.
///
/// Every edit is applied to the local cache immediately and queued as a
/// change. [`Client::synchronize`] sends the queue and adopts whatever the
/// server says is authoritative.
pub struct Client {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    store: ClientStore,
}

impl Client {
    /// Create a client with an empty store and the system clock.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    /// Create a client with an empty store and a custom clock.
    pub fn with_clock(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        Self::from_store(registry, clock, ClientStore::new())
    }

    /// Resume a client from a previously saved store.
    pub fn from_store(registry: Arc<Registry>, clock: Arc<dyn Clock>, store: ClientStore) -> Self {
        Self {
            registry,
            clock,
            store,
        }
    }

    /// The client's cached items and pending changes.
    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    /// Give up the client and keep its store, e.g. to persist it.
    pub fn into_store(self) -> ClientStore {
        self.store
    }

    /// Get a cached item.
    pub fn get(&self, id: &str) -> Option<&ClientDataItem> {
        self.store.get(id)
    }

    /// Get the cached value of an item.
    pub fn value(&self, id: &str) -> Option<&ItemValue> {
        self.store.value(id)
    }

    /// Get the unconfirmed changes of an item.
    pub fn pending(&self, id: &str) -> Option<&ChangeList> {
        self.store.pending(id)
    }

    /// The last confirmed checkpoint.
    pub fn timestamp(&self) -> Timestamp {
        self.store.timestamp()
    }

    /// Set a scalar value.
    pub fn update(&mut self, id: impl Into<ItemId>, value: serde_json::Value) -> Result<()> {
        let change = ValueChange::new(value, self.clock.now());
        self.apply_change(id, Change::Value(change))
    }

    /// Add `increment` to a counter. Negative values decrement.
    ///
    /// Fails with [`Error::InvalidChange`] if `increment` is not finite or
    /// the cached total would overflow.
    pub fn increase(&mut self, id: impl Into<ItemId>, increment: f64) -> Result<()> {
        let change = IncrementChange::with_random_uid(increment);
        self.apply_change(id, Change::Increment(change))
    }

    /// Add an element to a set.
    pub fn add(&mut self, id: impl Into<ItemId>, element: Element) -> Result<()> {
        let change = SetChange::new(element, SetOperation::Add, self.clock.now());
        self.apply_change(id, Change::Set(change))
    }

    /// Remove an element from a set.
    pub fn remove(&mut self, id: impl Into<ItemId>, element: Element) -> Result<()> {
        let change = SetChange::new(element, SetOperation::Remove, self.clock.now());
        self.apply_change(id, Change::Set(change))
    }

    /// Apply a local change through its data type's client strategy.
    ///
    /// Fails without touching the store if the data type has no registered
    /// strategy or the item already exists with another type.
    pub fn apply_change(&mut self, id: impl Into<ItemId>, change: Change) -> Result<()> {
        let id = id.into();
        let data_type = change.data_type();
        let strategy = self.registry.client(data_type)?;

        let mut item = match self.store.get(&id) {
            Some(item) if item.data_type() != data_type => {
                return Err(mismatch(&id, item.data_type(), data_type))
            }
            Some(item) => item.clone(),
            None => ClientDataItem::new(id.clone(), data_type),
        };
        let mut list = match self.store.pending(&id) {
            Some(list) if list.data_type() != data_type => {
                return Err(mismatch(&id, list.data_type(), data_type))
            }
            Some(list) => list.clone(),
            None => ChangeList::new(data_type),
        };

        strategy.apply(&mut item, &change)?;
        strategy.append(&mut list, change)?;

        self.store.insert_item(item);
        self.store.insert_change_list(id, list);
        Ok(())
    }

    /// Build the request for the next sync cycle.
    ///
    /// Freezes the trailing change of every list whose strategy asks for it,
    /// so edits made while the request is in flight start a new change.
    pub fn prepare_request(&mut self) -> Result<SyncRequest> {
        for list in self.store.change_lists().values() {
            self.registry.client(list.data_type())?;
        }

        for list in self.store.change_lists_mut() {
            if self.registry.client(list.data_type())?.mark_synced() {
                list.mark_last_synced();
            }
        }

        Ok(SyncRequest {
            timestamp: self.store.timestamp(),
            client_time: self.clock.now(),
            change_lists: self.store.change_lists().clone(),
        })
    }

    /// Adopt the server's response.
    ///
    /// Every returned value overwrites the cached item; afterwards all
    /// pending change lists are dropped and the checkpoint advances. The
    /// response is validated first, so a rejected response changes nothing.
    pub fn apply_response(&mut self, response: SyncResponse) -> Result<()> {
        if response.timestamp < self.store.timestamp() {
            return Err(Error::MalformedResponse(format!(
                "checkpoint moved backwards from {} to {}",
                self.store.timestamp(),
                response.timestamp
            )));
        }

        for (id, value) in &response.changes {
            let data_type = value.data_type();
            self.registry.client(data_type)?;
            if let Some(item) = self.store.get(id) {
                if item.data_type() != data_type {
                    return Err(mismatch(id, item.data_type(), data_type));
                }
            }
        }

        for (id, value) in response.changes {
            self.store.insert_item(ClientDataItem::with_value(id, value));
        }
        self.store.confirm(response.timestamp);
        Ok(())
    }

    /// Run one full sync cycle over `transport`.
    ///
    /// If the transport fails, pending changes are kept and the cycle can be
    /// retried from scratch.
    pub fn synchronize<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<SyncSummary> {
        let request = self.prepare_request()?;
        let sent = request.change_lists.len();
        tracing::debug!(sent, checkpoint = request.timestamp, "sending sync request");

        let response = transport.synchronize(request).map_err(|err| {
            tracing::warn!(error = %err, "sync request failed");
            err
        })?;
        let received = response.changes.len();
        let timestamp = response.timestamp;

        self.apply_response(response)?;
        tracing::debug!(received, checkpoint = timestamp, "sync cycle complete");

        Ok(SyncSummary {
            sent,
            received,
            timestamp,
        })
    }
}

fn mismatch(id: &str, expected: DataType, got: DataType) -> Error {
    Error::TypeMismatch {
        id: id.to_owned(),
        expected,
        got,
    }
}
