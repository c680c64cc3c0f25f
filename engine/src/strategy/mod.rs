//! Merge strategies and the registry that maps data types to them.
//!
//! Every [`DataType`] is backed by a [`StrategyPair`]: a [`ClientStrategy`]
//! deciding how local edits are queued and reflected in the cache, and a
//! [`ServerStrategy`] deciding how queued edits merge into the authoritative
//! item. Strategies never look at each other's state.
//!
//! The [`Registry`] is built once at startup and shared by the client and
//! the server. Adding a data type means registering one more pair.

mod increment;
mod set;
mod value;

pub use increment::IncrementStrategy;
pub use set::SetStrategy;
pub use value::ValueStrategy;

use crate::{
    error::Result, Calibrator, Change, ChangeList, ClientDataItem, DataType, Error, ItemValue,
    ServerDataItem,
};
use std::collections::HashMap;
use std::fmt;

/// Client half of a merge strategy.
pub trait ClientStrategy: Send + Sync {
    /// Whether the client must flag the trailing pending change as synced
    /// right before building a request, so later local edits start a new
    /// change instead of growing one that is already in flight.
    fn mark_synced(&self) -> bool {
        false
    }

    /// Fold a new local change into the pending list.
    fn append(&self, list: &mut ChangeList, change: Change) -> Result<()>;

    /// Reflect a local change in the cached item.
    fn apply(&self, item: &mut ClientDataItem, change: &Change) -> Result<()>;
}

/// Server half of a merge strategy.
///
/// `apply` must be idempotent for a given change identity: a client that
/// lost a response resends the same changes.
pub trait ServerStrategy: Send + Sync {
    /// Merge every change of `list` into `item`.
    ///
    /// Returns whether the item's value must still be echoed to the client
    /// that sent the list. `false` means the client already holds the
    /// authoritative value.
    fn apply(
        &self,
        item: &mut ServerDataItem,
        list: &ChangeList,
        calibrator: &Calibrator,
    ) -> Result<bool>;

    /// The value sent to clients for this item.
    fn client_value(&self, item: &ServerDataItem) -> Result<ItemValue>;
}

/// Client and server strategies registered for one data type.
pub struct StrategyPair {
    pub client: Box<dyn ClientStrategy>,
    pub server: Box<dyn ServerStrategy>,
}

/// Lookup table from data type to strategy pair.
#[derive(Default)]
pub struct Registry {
    pairs: HashMap<DataType, StrategyPair>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pairs: HashMap::new(),
        }
    }

    /// Create a registry with the built-in value, increment and set
    /// strategies.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(DataType::Value, ValueStrategy, ValueStrategy)
            .with(DataType::Increment, IncrementStrategy, IncrementStrategy)
            .with(DataType::Set, SetStrategy, SetStrategy)
    }

    /// Builder-style [`Registry::register`].
    pub fn with(
        mut self,
        data_type: DataType,
        client: impl ClientStrategy + 'static,
        server: impl ServerStrategy + 'static,
    ) -> Self {
        self.register(data_type, client, server);
        self
    }

    /// Register the strategy pair for a data type, replacing any previous one.
    pub fn register(
        &mut self,
        data_type: DataType,
        client: impl ClientStrategy + 'static,
        server: impl ServerStrategy + 'static,
    ) {
        self.pairs.insert(
            data_type,
            StrategyPair {
                client: Box::new(client),
                server: Box::new(server),
            },
        );
    }

    /// Check if a data type has a registered pair.
    pub fn contains(&self, data_type: DataType) -> bool {
        self.pairs.contains_key(&data_type)
    }

    /// Get the pair for a data type.
    pub fn pair(&self, data_type: DataType) -> Result<&StrategyPair> {
        self.pairs
            .get(&data_type)
            .ok_or(Error::InvalidDataType(data_type))
    }

    pub fn client(&self, data_type: DataType) -> Result<&dyn ClientStrategy> {
        self.pair(data_type).map(|pair| pair.client.as_ref())
    }

    pub fn server(&self, data_type: DataType) -> Result<&dyn ServerStrategy> {
        self.pair(data_type).map(|pair| pair.server.as_ref())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data_types: Vec<_> = self.pairs.keys().collect();
        data_types.sort();
        f.debug_struct("Registry")
            .field("data_types", &data_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_data_type() {
        let registry = Registry::with_defaults();
        for data_type in DataType::ALL {
            assert!(registry.contains(data_type));
            assert!(registry.client(data_type).is_ok());
            assert!(registry.server(data_type).is_ok());
        }
    }

    #[test]
    fn missing_pair_is_invalid_data_type() {
        let registry = Registry::new().with(DataType::Value, ValueStrategy, ValueStrategy);

        assert!(!registry.contains(DataType::Set));
        assert_eq!(
            registry.client(DataType::Set).err(),
            Some(Error::InvalidDataType(DataType::Set))
        );
        assert_eq!(
            registry.server(DataType::Increment).err(),
            Some(Error::InvalidDataType(DataType::Increment))
        );
    }

    #[test]
    fn mark_synced_is_only_set_for_increments() {
        let registry = Registry::with_defaults();
        assert!(!registry.client(DataType::Value).unwrap().mark_synced());
        assert!(registry.client(DataType::Increment).unwrap().mark_synced());
        assert!(!registry.client(DataType::Set).unwrap().mark_synced());
    }

    #[test]
    fn debug_lists_registered_types() {
        let registry = Registry::with_defaults();
        assert_eq!(
            format!("{:?}", registry),
            "Registry { data_types: [Value, Increment, Set] }"
        );
    }
}
