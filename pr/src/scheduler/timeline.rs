//! Fixed-capacity dispatch horizon
//!
//! Slot 0 is "due now". Each dispatcher tick pops slot 0 and appends an empty
//! slot at the tail, so an item placed at index `n` becomes due `n` ticks later.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::debug;

use crate::domain::WorkItem;

/// Errors from direct slot writes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("slot {index} is outside a timeline of capacity {capacity}")]
    OutOfRange { index: usize, capacity: usize },

    #[error("slot {index} is already occupied")]
    SlotTaken { index: usize },
}

/// Ordered slot array with an exact occupied-slot counter
#[derive(Debug)]
pub struct Timeline {
    slots: VecDeque<Option<WorkItem>>,
    occupied: usize,
}

impl Timeline {
    /// Create an empty timeline with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        debug!(%capacity, "Timeline::new: called");
        let mut slots = VecDeque::with_capacity(capacity);
        slots.resize(capacity, None);
        Self { slots, occupied: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.capacity()
    }

    /// The item due on the next tick, if any
    pub fn front(&self) -> Option<&WorkItem> {
        self.slots.front().and_then(Option::as_ref)
    }

    /// Item at `index`, if that slot exists and is occupied
    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Store `item` at `index`
    pub fn occupy(&mut self, index: usize, item: WorkItem) -> Result<(), TimelineError> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(TimelineError::OutOfRange { index, capacity })?;

        if slot.is_some() {
            return Err(TimelineError::SlotTaken { index });
        }

        *slot = Some(item);
        self.occupied += 1;
        Ok(())
    }

    /// Remove slot 0, shift everything one slot earlier and append an empty tail
    ///
    /// Returns whatever was due in slot 0. The length never changes.
    pub fn advance(&mut self) -> Option<WorkItem> {
        let front = self.slots.pop_front()?;
        self.slots.push_back(None);

        if front.is_some() {
            self.occupied -= 1;
        }
        front
    }

    /// Lowest-index empty slot
    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Empty slot closest to `target`, searching later slots before earlier ones
    ///
    /// `target` is clamped into range. The upward scan runs to the tail before
    /// the downward scan starts, so ties always resolve to the later slot.
    pub fn find_nearest_free(&self, target: usize) -> Option<usize> {
        let capacity = self.capacity();
        if capacity == 0 || self.is_full() {
            return None;
        }

        let target = target.min(capacity - 1);
        (target..capacity)
            .find(|&i| self.slots[i].is_none())
            .or_else(|| (0..target).rev().find(|&i| self.slots[i].is_none()))
    }

    /// Recount occupied slots from scratch
    #[cfg(test)]
    fn recount(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
