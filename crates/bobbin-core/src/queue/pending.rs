//! Ordered pending store.
//!
//! Keyed by `(priority, arrival seq)`: lower priority value first, then
//! earlier arrival. Holds ids only; records live in the entry map.

use std::collections::BTreeMap;

use crate::domain::{Priority, TaskId};

#[derive(Debug, Default)]
pub(crate) struct PendingStore {
    order: BTreeMap<(Priority, u64), TaskId>,
}

impl PendingStore {
    pub fn push(&mut self, priority: Priority, seq: u64, id: TaskId) {
        self.order.insert((priority, seq), id);
    }

    /// Remove and return the most urgent id.
    pub fn pop_head(&mut self) -> Option<TaskId> {
        self.order.pop_first().map(|(_, id)| id)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Empty the store, returning ids in dispatch order.
    pub fn drain(&mut self) -> Vec<TaskId> {
        std::mem::take(&mut self.order).into_values().collect()
    }
}
