//! Last-write-wins scalar values.

use super::{ClientStrategy, ServerStrategy};
use crate::{
    error::Result, Calibrator, Change, ChangeList, ClientDataItem, DataType, Error, ItemValue,
    ServerDataItem, ServerState,
};

/// Only the newest local value is worth sending; the server keeps the write
/// with the latest calibrated time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueStrategy;

impl ClientStrategy for ValueStrategy {
    fn append(&self, list: &mut ChangeList, change: Change) -> Result<()> {
        let Change::Value(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Value,
                got: change.data_type(),
            });
        };
        if list.data_type() != DataType::Value {
            return Err(Error::UnexpectedChange {
                expected: list.data_type(),
                got: DataType::Value,
            });
        }

        *list = ChangeList::Value(vec![change]);
        Ok(())
    }

    fn apply(&self, item: &mut ClientDataItem, change: &Change) -> Result<()> {
        let Change::Value(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Value,
                got: change.data_type(),
            });
        };
        let ItemValue::Value(value) = &mut item.value else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Value,
            });
        };

        *value = change.value.clone();
        Ok(())
    }
}

impl ServerStrategy for ValueStrategy {
    fn apply(
        &self,
        item: &mut ServerDataItem,
        list: &ChangeList,
        calibrator: &Calibrator,
    ) -> Result<bool> {
        let ChangeList::Value(changes) = list else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Value,
                got: list.data_type(),
            });
        };
        let ServerState::Value {
            value,
            last_modified_time,
        } = &mut item.state
        else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Value,
            });
        };

        // The client compacts to a single change; take the newest regardless.
        let Some(change) = changes.last() else {
            return Ok(true);
        };

        let change_time = calibrator.calibrate(change.last_modified_time);

        match *last_modified_time {
            Some(current) if change_time <= current => {
                tracing::debug!(
                    item_id = %item.id,
                    change_time,
                    current,
                    "stale value write rejected"
                );
                Ok(true)
            }
            _ => {
                *value = change.value.clone();
                *last_modified_time = Some(change_time);
                // The client now holds the latest value.
                Ok(false)
            }
        }
    }

    fn client_value(&self, item: &ServerDataItem) -> Result<ItemValue> {
        match &item.state {
            ServerState::Value { value, .. } => Ok(ItemValue::Value(value.clone())),
            other => Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Value,
                got: other.data_type(),
            }),
        }
    }
}
