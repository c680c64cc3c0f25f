//! Server - the authoritative half of the sync cycle.
//!
//! # Algorithm
//!
//! For one [`SyncRequest`]:
//!
//! 1. Take the commit lock, issue `now` and build the [`Calibrator`] for
//!    the request
//! 2. Resolve the strategy of every change list; an unknown type aborts
//!    before any item is written
//! 3. Apply each list to its item under the store's per-item lock, stamping
//!    the item with `now` and recording the ids that need no echo, then
//!    release the commit lock
//! 4. Return every item mutated after the client's checkpoint, minus the
//!    ids recorded in step 3
//!
//! Steps 1 to 3 run one request at a time, so items are stamped in commit
//! order. Step 4 runs concurrently.

use crate::{
    error::Result, Calibrator, ChangeList, Clock, Error, ItemId, ItemValue, MemoryStore,
    Registry, ServerDataItem, ServerStore, ServerStrategy, SyncRequest, SyncResponse,
    SystemClock, Timestamp, Transport,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The authoritative sync server.
///
/// `Server` is `Send + Sync`; one instance serves every client.
pub struct Server {
    registry: Arc<Registry>,
    store: Arc<dyn ServerStore>,
    clock: Arc<dyn Clock>,
    /// Last timestamp handed out, so checkpoints strictly increase
    last_timestamp: AtomicI64,
    /// Held from issuing `now` until the request's writes are committed
    commit_lock: Mutex<()>,
}

impl Server {
    /// Create a server with an in-memory store and the system clock.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    /// Create a server with an in-memory store and a custom clock.
    pub fn with_clock(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(registry, Arc::new(MemoryStore::new()), clock)
    }

    /// Create a server over a custom store and clock.
    pub fn with_parts(
        registry: Arc<Registry>,
        store: Arc<dyn ServerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            last_timestamp: AtomicI64::new(Timestamp::MIN),
            commit_lock: Mutex::new(()),
        }
    }

    /// The strategy registry shared with clients.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The authoritative item store.
    pub fn store(&self) -> &dyn ServerStore {
        self.store.as_ref()
    }

    /// The value a client would receive for an item.
    pub fn client_value(&self, id: &str) -> Result<Option<ItemValue>> {
        match self.store.get(id) {
            Some(item) => {
                let strategy = self.registry.server(item.data_type())?;
                strategy.client_value(&item).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Process one sync request.
    pub fn synchronize(&self, request: SyncRequest) -> Result<SyncResponse> {
        let (calibrator, excludes) = self.commit(&request)?;
        let changes = self.collect_changes(request.timestamp, &excludes)?;

        tracing::debug!(
            checkpoint = request.timestamp,
            now = calibrator.now(),
            offset = calibrator.offset(),
            received = request.change_lists.len(),
            echoed = changes.len(),
            "sync request processed"
        );

        Ok(SyncResponse {
            timestamp: calibrator.now(),
            changes,
        })
    }

    /// Process a request in the JSON wire format.
    pub fn handle_json(&self, body: &str) -> Result<String> {
        let request = SyncRequest::decode(body)?;
        self.synchronize(request)?.encode()
    }

    /// Issue `now` and apply every change list of `request`.
    ///
    /// Writes are stamped and committed under one lock, so a request that
    /// receives `now` as its checkpoint can never scan the store while a
    /// write stamped at or below it is still pending.
    fn commit<'r>(&self, request: &'r SyncRequest) -> Result<(Calibrator, HashSet<&'r str>)> {
        let _guard = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.next_timestamp();
        let calibrator = Calibrator::new(now, request.client_time);

        let mut resolved = Vec::with_capacity(request.change_lists.len());
        for (id, list) in &request.change_lists {
            let strategy = self.registry.server(list.data_type())?;
            if let Some(existing) = self.store.get(id) {
                if existing.data_type() != list.data_type() {
                    return Err(Error::TypeMismatch {
                        id: id.clone(),
                        expected: existing.data_type(),
                        got: list.data_type(),
                    });
                }
            }
            resolved.push((id, list, strategy));
        }

        let mut excludes = HashSet::new();
        for (id, list, strategy) in resolved {
            if !self.apply_change_list(id, list, strategy, now, &calibrator)? {
                excludes.insert(id.as_str());
            }
        }

        Ok((calibrator, excludes))
    }

    fn apply_change_list(
        &self,
        id: &str,
        list: &ChangeList,
        strategy: &dyn ServerStrategy,
        now: Timestamp,
        calibrator: &Calibrator,
    ) -> Result<bool> {
        let data_type = list.data_type();
        let mut echo = true;

        self.store.update(id, &mut |current| {
            let mut item = match current {
                Some(item) if item.data_type() != data_type => {
                    return Err(Error::TypeMismatch {
                        id: id.to_owned(),
                        expected: item.data_type(),
                        got: data_type,
                    })
                }
                Some(item) => item,
                None => ServerDataItem::new(id, data_type, now),
            };
            item.timestamp = now;
            echo = strategy.apply(&mut item, list, calibrator)?;
            Ok(item)
        })?;

        tracing::trace!(
            item_id = %id,
            data_type = %data_type,
            changes = list.len(),
            echo,
            "change list applied"
        );
        Ok(echo)
    }

    fn collect_changes(
        &self,
        since: Timestamp,
        excludes: &HashSet<&str>,
    ) -> Result<BTreeMap<ItemId, ItemValue>> {
        self.store
            .changed_since(since)
            .into_iter()
            .filter(|item| !excludes.contains(item.id.as_str()))
            .map(|item| {
                let strategy = self.registry.server(item.data_type())?;
                let value = strategy.client_value(&item)?;
                Ok((item.id, value))
            })
            .collect()
    }

    /// Wall-clock time, bumped past the previous timestamp if the clock
    /// has not moved.
    fn next_timestamp(&self) -> Timestamp {
        let wall = self.clock.now();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wall.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        wall.max(previous.saturating_add(1))
    }
}

impl Transport for Server {
    fn synchronize(&self, request: SyncRequest) -> Result<SyncResponse> {
        Server::synchronize(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DataType, IncrementChange, ManualClock, SetChange, SetOperation, ValueChange,
        ValueStrategy,
    };
    use serde_json::json;

    fn test_server() -> (Server, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let server = Server::with_clock(Arc::new(Registry::with_defaults()), clock.clone());
        (server, clock)
    }

    fn request(timestamp: Timestamp, lists: Vec<(&str, ChangeList)>) -> SyncRequest {
        SyncRequest {
            timestamp,
            client_time: 10_000,
            change_lists: lists
                .into_iter()
                .map(|(id, list)| (id.to_string(), list))
                .collect(),
        }
    }

    fn value_list(value: serde_json::Value, time: Timestamp) -> ChangeList {
        ChangeList::Value(vec![ValueChange::new(value, time)])
    }

    #[test]
    fn timestamps_strictly_increase() {
        let (server, clock) = test_server();
        let first = server.synchronize(request(0, vec![])).unwrap();
        let second = server.synchronize(request(0, vec![])).unwrap();
        assert_eq!(first.timestamp, 10_000);
        assert_eq!(second.timestamp, 10_001);

        clock.set(20_000);
        let third = server.synchronize(request(0, vec![])).unwrap();
        assert_eq!(third.timestamp, 20_000);

        // A clock stepping backwards does not move checkpoints backwards.
        clock.set(5_000);
        let fourth = server.synchronize(request(0, vec![])).unwrap();
        assert_eq!(fourth.timestamp, 20_001);
    }

    #[test]
    fn accepted_value_is_not_echoed() {
        let (server, _) = test_server();
        let response = server
            .synchronize(request(0, vec![("x", value_list(json!(5), 9_000))]))
            .unwrap();

        assert_eq!(response.timestamp, 10_000);
        assert!(response.changes.is_empty());
        assert_eq!(
            server.client_value("x").unwrap(),
            Some(ItemValue::Value(json!(5)))
        );
        assert_eq!(server.store().get("x").unwrap().timestamp, 10_000);
    }

    #[test]
    fn rejected_value_is_echoed() {
        let (server, clock) = test_server();
        server
            .synchronize(request(0, vec![("x", value_list(json!("new"), 9_500))]))
            .unwrap();

        clock.advance(100);
        let response = server
            .synchronize(request(0, vec![("x", value_list(json!("old"), 9_000))]))
            .unwrap();

        assert_eq!(
            response.changes.get("x"),
            Some(&ItemValue::Value(json!("new")))
        );
    }

    #[test]
    fn only_items_changed_since_checkpoint_are_returned() {
        let (server, clock) = test_server();
        server
            .synchronize(request(
                0,
                vec![("old", ChangeList::Increment(vec![IncrementChange::new("u1", 1.0)]))],
            ))
            .unwrap();

        clock.advance(1_000);
        let checkpoint = clock.now() - 1;
        server
            .synchronize(request(
                0,
                vec![("new", ChangeList::Increment(vec![IncrementChange::new("u2", 2.0)]))],
            ))
            .unwrap();

        let response = server.synchronize(request(checkpoint, vec![])).unwrap();
        assert_eq!(response.changes.len(), 1);
        assert_eq!(response.changes["new"], ItemValue::Increment(2.0));
    }

    #[test]
    fn set_values_are_presented_as_element_lists() {
        let (server, _) = test_server();
        let list = ChangeList::Set(vec![
            SetChange::new(3, SetOperation::Add, 9_000),
            SetChange::new(1, SetOperation::Add, 9_000),
            SetChange::new(2, SetOperation::Remove, 9_000),
        ]);
        let response = server.synchronize(request(0, vec![("tags", list)])).unwrap();

        assert_eq!(response.changes["tags"], ItemValue::Set(vec![1, 3]));
    }

    #[test]
    fn unknown_type_aborts_before_any_write() {
        let registry = Registry::new().with(DataType::Value, ValueStrategy, ValueStrategy);
        let server = Server::with_clock(Arc::new(registry), Arc::new(ManualClock::new(1)));

        let result = server.synchronize(request(
            0,
            vec![
                ("a", value_list(json!(1), 1)),
                ("b", ChangeList::Increment(vec![IncrementChange::new("u1", 1.0)])),
            ],
        ));

        assert_eq!(result, Err(Error::InvalidDataType(DataType::Increment)));
        assert!(server.store().is_empty());
    }

    #[test]
    fn type_change_for_existing_item_is_rejected() {
        let (server, _) = test_server();
        server
            .synchronize(request(0, vec![("x", value_list(json!(1), 9_000))]))
            .unwrap();

        let result = server.synchronize(request(
            0,
            vec![("x", ChangeList::Increment(vec![IncrementChange::new("u1", 1.0)]))],
        ));

        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
        assert_eq!(
            server.client_value("x").unwrap(),
            Some(ItemValue::Value(json!(1)))
        );
    }

    #[test]
    fn handle_json_speaks_the_wire_format() {
        let (server, _) = test_server();
        let reply = server
            .handle_json(
                r#"{
                    "timestamp": 0,
                    "clientTime": 10000,
                    "changeLists": {
                        "likes": { "type": "increment", "changes": [{ "uid": "u1", "increment": 3 }] }
                    }
                }"#,
            )
            .unwrap();

        let response = SyncResponse::decode(&reply).unwrap();
        assert_eq!(response.changes["likes"], ItemValue::Increment(3.0));
    }

    #[test]
    fn handle_json_rejects_garbage() {
        let (server, _) = test_server();
        assert!(matches!(
            server.handle_json("{\"timestamp\": \"soon\"}"),
            Err(Error::Decode(_))
        ));
    }
}
