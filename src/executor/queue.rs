//! Bounded FIFO of pending tasks.
//!
//! Backed by a ring buffer allocated once at pool init, so push and pop are
//! O(1) and never reallocate. The queue itself does no locking; callers hold
//! the pool lock around every access.

use super::task::Task;
use crate::error::{Error, Result};
use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) struct TaskQueue<T = Task> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> TaskQueue<T> {
    /// Allocate storage for `capacity` items up front.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut items = VecDeque::new();
        items.try_reserve_exact(capacity).map_err(|e| {
            Error::allocation(format!("task queue of capacity {}: {}", capacity, e))
        })?;

        Ok(Self { items, capacity })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append at the tail. Returns the item back if the bound is reached.
    pub fn push(&mut self, item: T) -> std::result::Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }
}
