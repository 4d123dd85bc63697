//! Deferred good-til cancellation.
//!
//! ## Deadlines
//!
//! A task is due once the block height reaches a [`Deadline::Height`] or
//! the block time reaches a [`Deadline::Time`]. An order with both kinds
//! registers two tasks; the second to fire finds the order gone.
//!
//! ## DelayQueue
//!
//! Tasks live in a [`Slab`], indexed by two ordered maps keyed by
//! `(deadline, order_sequence)`:
//!
//! ```text
//! by_height: (343, 7) -> slab key 0
//!            (400, 2) -> slab key 2
//! by_time:   (1700000000, 9) -> slab key 1
//! ```
//!
//! A [`TaskHandle`] is the index key itself, so it can be rebuilt from the
//! stored order without persisting handles.

use std::collections::BTreeMap;

use slab::Slab;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("order {order_sequence} is already scheduled at {deadline:?}")]
    AlreadyScheduled {
        order_sequence: u64,
        deadline: Deadline,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Deadline {
    Height(u64),
    /// Unix seconds.
    Time(u64),
}

/// Cancellation to run when the deadline arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoodTilTask {
    pub order_sequence: u64,
    pub creator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub deadline: Deadline,
    pub order_sequence: u64,
}

pub trait GoodTilScheduler {
    fn schedule(&mut self, task: GoodTilTask, deadline: Deadline) -> Result<TaskHandle, SchedulerError>;

    /// Remove a pending task. Unknown handles are ignored.
    fn cancel(&mut self, handle: &TaskHandle);

    /// Remove and return every task due at `(height, time)`, height
    /// deadlines first, each kind in deadline then sequence order.
    fn pop_due(&mut self, height: u64, time: u64) -> Vec<GoodTilTask>;
}

/// Slab-backed in-memory scheduler.
#[derive(Debug, Default, Clone)]
pub struct DelayQueue {
    tasks: Slab<GoodTilTask>,
    by_height: BTreeMap<(u64, u64), usize>,
    by_time: BTreeMap<(u64, u64), usize>,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Slab::with_capacity(capacity),
            by_height: BTreeMap::new(),
            by_time: BTreeMap::new(),
        }
    }

    /// Pending tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, handle: &TaskHandle) -> bool {
        let (index, key) = self.index(handle);
        index.contains_key(&key)
    }

    fn index(&self, handle: &TaskHandle) -> (&BTreeMap<(u64, u64), usize>, (u64, u64)) {
        match handle.deadline {
            Deadline::Height(h) => (&self.by_height, (h, handle.order_sequence)),
            Deadline::Time(t) => (&self.by_time, (t, handle.order_sequence)),
        }
    }

    fn index_mut(&mut self, deadline: Deadline, order_sequence: u64) -> (&mut BTreeMap<(u64, u64), usize>, (u64, u64)) {
        match deadline {
            Deadline::Height(h) => (&mut self.by_height, (h, order_sequence)),
            Deadline::Time(t) => (&mut self.by_time, (t, order_sequence)),
        }
    }

    fn drain_due(index: &mut BTreeMap<(u64, u64), usize>, limit: u64) -> Vec<usize> {
        let due: Vec<(u64, u64)> = index
            .range(..=(limit, u64::MAX))
            .map(|(key, _)| *key)
            .collect();
        due.into_iter().filter_map(|key| index.remove(&key)).collect()
    }
}

impl GoodTilScheduler for DelayQueue {
    fn schedule(&mut self, task: GoodTilTask, deadline: Deadline) -> Result<TaskHandle, SchedulerError> {
        let order_sequence = task.order_sequence;
        let (index, key) = self.index_mut(deadline, order_sequence);
        if index.contains_key(&key) {
            return Err(SchedulerError::AlreadyScheduled {
                order_sequence,
                deadline,
            });
        }
        let slot = self.tasks.insert(task);
        let (index, key) = self.index_mut(deadline, order_sequence);
        index.insert(key, slot);
        tracing::debug!(order_sequence, ?deadline, "good til scheduled");
        Ok(TaskHandle {
            deadline,
            order_sequence,
        })
    }

    fn cancel(&mut self, handle: &TaskHandle) {
        let (index, key) = self.index_mut(handle.deadline, handle.order_sequence);
        if let Some(slot) = index.remove(&key) {
            self.tasks.try_remove(slot);
            tracing::debug!(order_sequence = handle.order_sequence, deadline = ?handle.deadline, "good til cancelled");
        }
    }

    fn pop_due(&mut self, height: u64, time: u64) -> Vec<GoodTilTask> {
        let mut slots = Self::drain_due(&mut self.by_height, height);
        slots.extend(Self::drain_due(&mut self.by_time, time));
        slots
            .into_iter()
            .filter_map(|slot| self.tasks.try_remove(slot))
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
