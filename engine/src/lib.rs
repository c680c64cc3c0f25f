//! # Syncline Engine
//!
//! An offline-first synchronization engine for client/server applications.
//!
//! A [`Client`] accumulates local edits while disconnected and periodically
//! reconciles with an authoritative [`Server`]. The server merges concurrent
//! edits from many clients using a merge strategy chosen by the item's
//! [`DataType`], calibrates client clocks against its own, and tolerates
//! retried requests.
//!
//! ## Design Principles
//!
//! - **No IO**: the transport and the durable store are collaborators behind
//!   the [`Transport`] and [`ServerStore`] traits
//! - **Pluggable strategies**: each data type registers a client/server
//!   strategy pair in an explicit [`Registry`]
//! - **Idempotent**: every server strategy is safe to apply twice
//!
//! ## Data Types
//!
//! - [`DataType::Value`] - last write wins by calibrated time
//! - [`DataType::Increment`] - commutative counter, de-duplicated by operation id
//! - [`DataType::Set`] - element-level add/remove, latest operation per element wins
//!
//! ## Sync Cycle
//!
//! 1. Local edits go through the client strategy: `append` folds the change
//!    into the pending [`ChangeList`], `apply` updates the cached item.
//! 2. [`Client::synchronize`] packages every pending list into a
//!    [`SyncRequest`] and hands it to the transport.
//! 3. [`Server::synchronize`] applies each list, then returns every item
//!    mutated since the client's checkpoint, minus the ones the client
//!    already holds the latest value for.
//! 4. The client adopts the returned values, clears its pending lists and
//!    advances its checkpoint.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use syncline_engine::{Client, ItemValue, Registry, Server};
//! use serde_json::json;
//!
//! let registry = Arc::new(Registry::with_defaults());
//! let server = Server::new(registry.clone());
//!
//! let mut alice = Client::new(registry.clone());
//! let mut bob = Client::new(registry);
//!
//! alice.update("title", json!("Groceries")).unwrap();
//! alice.increase("visits", 2.0).unwrap();
//! alice.synchronize(&server).unwrap();
//!
//! bob.increase("visits", 1.0).unwrap();
//! bob.synchronize(&server).unwrap();
//!
//! assert_eq!(bob.value("title"), Some(&ItemValue::Value(json!("Groceries"))));
//! assert_eq!(bob.value("visits"), Some(&ItemValue::Increment(3.0)));
//! ```

pub mod backend;
pub mod change;
pub mod client;
pub mod clock;
pub mod error;
pub mod item;
pub mod protocol;
pub mod server;
pub mod store;
pub mod strategy;
pub mod transport;

// Re-export main types at crate root
pub use backend::{MemoryStore, ServerStore};
pub use change::{
    Change, ChangeList, DataType, IncrementChange, SetChange, SetOperation, ValueChange,
};
pub use client::{Client, SyncSummary};
pub use clock::{Calibrator, Clock, ManualClock, SystemClock};
pub use error::Error;
pub use item::{ClientDataItem, ElementOperation, ItemValue, ServerDataItem, ServerState};
pub use protocol::{SyncRequest, SyncResponse};
pub use server::Server;
pub use store::ClientStore;
pub use strategy::{
    ClientStrategy, IncrementStrategy, Registry, ServerStrategy, SetStrategy, StrategyPair,
    ValueStrategy,
};
pub use transport::{JsonTransport, Transport};

/// Type aliases for clarity
pub type ItemId = String;
pub type OperationId = String;
pub type Element = i64;
/// Milliseconds since the Unix epoch on the producing clock.
pub type Timestamp = i64;
