//! Unordered sets of numeric elements.
//!
//! Each element is an independent last-write-wins register holding the
//! latest add or remove. The server keeps the operation log per element and
//! presents clients with the elements whose latest operation is an add.

use super::{ClientStrategy, ServerStrategy};
use crate::{
    error::Result, Calibrator, Change, ChangeList, ClientDataItem, DataType, ElementOperation,
    Error, ItemValue, ServerDataItem, ServerState, SetOperation,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SetStrategy;

impl ClientStrategy for SetStrategy {
    fn append(&self, list: &mut ChangeList, change: Change) -> Result<()> {
        let Change::Set(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Set,
                got: change.data_type(),
            });
        };
        let changes = match list {
            ChangeList::Set(changes) => changes,
            other => {
                return Err(Error::UnexpectedChange {
                    expected: other.data_type(),
                    got: DataType::Set,
                })
            }
        };

        // Only the latest pending operation per element matters.
        changes.retain(|pending| pending.element != change.element);
        changes.push(change);
        Ok(())
    }

    fn apply(&self, item: &mut ClientDataItem, change: &Change) -> Result<()> {
        let Change::Set(change) = change else {
            return Err(Error::UnexpectedChange {
                expected: DataType::Set,
                got: change.data_type(),
            });
        };
        let ItemValue::Set(elements) = &mut item.value else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Set,
            });
        };

        let position = elements.iter().position(|e| *e == change.element);
        match (change.operation, position) {
            (SetOperation::Add, None) => elements.push(change.element),
            (SetOperation::Remove, Some(index)) => {
                elements.remove(index);
            }
            _ => {}
        }
        Ok(())
    }
}

impl ServerStrategy for SetStrategy {
    fn apply(
        &self,
        item: &mut ServerDataItem,
        list: &ChangeList,
        calibrator: &Calibrator,
    ) -> Result<bool> {
        let ChangeList::Set(changes) = list else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Set,
                got: list.data_type(),
            });
        };
        let ServerState::Set { elements } = &mut item.state else {
            return Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: item.data_type(),
                got: DataType::Set,
            });
        };

        for change in changes {
            let time = calibrator.calibrate(change.time);

            if let Some(current) = elements.get(&change.element) {
                if current.time > time {
                    tracing::debug!(
                        item_id = %item.id,
                        element = change.element,
                        time,
                        current = current.time,
                        "stale set operation skipped"
                    );
                    continue;
                }
            }

            elements.insert(
                change.element,
                ElementOperation {
                    operation: change.operation,
                    time,
                },
            );
        }

        Ok(true)
    }

    fn client_value(&self, item: &ServerDataItem) -> Result<ItemValue> {
        match &item.state {
            ServerState::Set { elements } => Ok(ItemValue::Set(
                elements
                    .iter()
                    .filter(|(_, op)| op.operation == SetOperation::Add)
                    .map(|(element, _)| *element)
                    .collect(),
            )),
            other => Err(Error::TypeMismatch {
                id: item.id.clone(),
                expected: DataType::Set,
                got: other.data_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SetChange;
    use proptest::prelude::*;

    fn add(element: i64, time: i64) -> SetChange {
        SetChange::new(element, SetOperation::Add, time)
    }

    fn remove(element: i64, time: i64) -> SetChange {
        SetChange::new(element, SetOperation::Remove, time)
    }

    fn elements(item: &ServerDataItem) -> Vec<i64> {
        match SetStrategy.client_value(item).unwrap() {
            ItemValue::Set(elements) => elements,
            other => panic!("unexpected value {:?}", other),
        }
    }

    fn apply(item: &mut ServerDataItem, changes: Vec<SetChange>) -> bool {
        ServerStrategy::apply(
            &SetStrategy,
            item,
            &ChangeList::Set(changes),
            &Calibrator::new(1_000_000, 1_000_000),
        )
        .unwrap()
    }

    #[test]
    fn append_replaces_pending_change_for_same_element() {
        let mut list = ChangeList::new(DataType::Set);
        SetStrategy.append(&mut list, Change::Set(add(1, 10))).unwrap();
        SetStrategy.append(&mut list, Change::Set(add(2, 20))).unwrap();
        SetStrategy.append(&mut list, Change::Set(remove(1, 30))).unwrap();

        assert_eq!(list, ChangeList::Set(vec![add(2, 20), remove(1, 30)]));
    }

    #[test]
    fn client_apply_adds_and_removes() {
        let mut item = ClientDataItem::new("tags", DataType::Set);
        for change in [add(3, 1), add(1, 2), add(3, 3), remove(2, 4), remove(3, 5)] {
            ClientStrategy::apply(&SetStrategy, &mut item, &Change::Set(change)).unwrap();
        }
        assert_eq!(item.value, ItemValue::Set(vec![1]));
    }

    #[test]
    fn server_keeps_latest_operation_per_element() {
        let mut item = ServerDataItem::new("tags", DataType::Set, 0);
        assert!(apply(&mut item, vec![add(1, 100), add(2, 100), add(3, 100)]));
        assert!(apply(&mut item, vec![remove(2, 200), remove(3, 50)]));

        assert_eq!(elements(&item), vec![1, 3]);
    }

    #[test]
    fn stale_add_does_not_resurrect_element() {
        let mut item = ServerDataItem::new("tags", DataType::Set, 0);
        apply(&mut item, vec![add(5, 100), remove(5, 300)]);
        apply(&mut item, vec![add(5, 200)]);

        assert!(elements(&item).is_empty());
    }

    #[test]
    fn client_value_is_sorted() {
        let mut item = ServerDataItem::new("tags", DataType::Set, 0);
        apply(&mut item, vec![add(9, 1), add(-4, 1), add(2, 1)]);
        assert_eq!(elements(&item), vec![-4, 2, 9]);
    }

    proptest! {
        #[test]
        fn prop_order_of_distinct_times_does_not_matter(
            t1 in 0i64..1_000_000,
            t2 in 0i64..1_000_000,
            first_adds in any::<bool>(),
        ) {
            prop_assume!(t1 != t2);
            let (a, b) = if first_adds {
                (add(7, t1), remove(7, t2))
            } else {
                (remove(7, t1), add(7, t2))
            };

            let mut forward = ServerDataItem::new("x", DataType::Set, 0);
            apply(&mut forward, vec![a.clone()]);
            apply(&mut forward, vec![b.clone()]);

            let mut backward = ServerDataItem::new("x", DataType::Set, 0);
            apply(&mut backward, vec![b]);
            apply(&mut backward, vec![a]);

            prop_assert_eq!(elements(&forward), elements(&backward));
        }
    }
}
