//! Commutative counters.

use super::{ClientStrategy, ServerStrategy};
use crate::{
    error::Result, Calibrator, Change, ChangeList, ClientDataItem, DataType, Error, ItemValue,
    ServerDataItem, ServerState,
};

/// Clients coalesce rapid increments locally; the server sums every
/// operation exactly once, keyed by its uid.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementStrategy;

impl ClientStrategy for IncrementStrategy {
    fn mark_synced(&self) -> bool {
        true
    }

    fn append(&self, list: &mut ChangeList, change: Change) -> Result<()> {
        let Change::Increment(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Increment,
                got: change.data_type(),
            });
        };
        let changes = match list {
            ChangeList::Increment(changes) => changes,
            other => {
                return Err(Error::UnexpectedChange {
                    expected: other.data_type(),
                    got: DataType::Increment,
                })
            }
        };

        match changes.last_mut() {
            Some(last) if !last.synced && (last.increment + change.increment).is_finite() => {
                last.increment += change.increment
            }
            _ => changes.push(change),
        }
        Ok(())
    }

    fn apply(&self, item: &mut ClientDataItem, change: &Change) -> Result<()> {
        let Change::Increment(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Increment,
                got: change.data_type(),
            });
        };
        let ItemValue::Increment(value) = &mut item.value else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Increment,
            });
        };

        check_finite(&item.id, change.increment)?;
        let next = *value + change.increment;
        if !next.is_finite() {
            return Err(Error::InvalidChange {
                id: item.id.clone(),
                reason: format!("adding {} overflows the counter", change.increment),
            });
        }
        *value = next;
        Ok(())
    }
}

impl ServerStrategy for IncrementStrategy {
    fn apply(
        &self,
        item: &mut ServerDataItem,
        list: &ChangeList,
        _calibrator: &Calibrator,
    ) -> Result<bool> {
        let ChangeList::Increment(changes) = list else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Increment,
                got: list.data_type(),
            });
        };
        let ServerState::Increment { total, uids } = &mut item.state else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Increment,
            });
        };

        for change in changes {
            check_finite(&item.id, change.increment)?;
            if uids.contains(&change.uid) {
                tracing::debug!(item_id = %item.id, uid = %change.uid, "duplicate increment skipped");
                continue;
            }
            // The uid stays unrecorded so a later retry can still count it.
            let next = *total + change.increment;
            if !next.is_finite() {
                tracing::warn!(
                    item_id = %item.id,
                    uid = %change.uid,
                    increment = change.increment,
                    "increment would overflow counter, dropped"
                );
                continue;
            }
            uids.insert(change.uid.clone());
            *total = next;
        }

        // Other clients may have contributed to the total.
        Ok(true)
    }

    fn client_value(&self, item: &ServerDataItem) -> Result<ItemValue> {
        match &item.state {
            ServerState::Increment { total, .. } => Ok(ItemValue::Increment(*total)),
            other => Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Increment,
                got: other.data_type(),
            }),
        }
    }
}

fn check_finite(id: &str, increment: f64) -> Result<()> {
    if increment.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidChange {
            id: id.to_owned(),
            reason: format!("increment {} is not finite", increment),
        })
    }
}
