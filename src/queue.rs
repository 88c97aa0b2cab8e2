//! Pending editor work.
//!
//! `WorkItem` is one unit of editor processing (a parameter change request,
//! in either direction). Items have no identity beyond FIFO position and are
//! never mutated after creation. `WorkQueue` buffers them while the editor
//! worker is busy; only the router task touches it, so no locking is needed.

use std::collections::VecDeque;

/// Where a work item originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrigin {
    /// Produced by the UI (outbound toward the device)
    Ui,
    /// Produced by the MIDI worker (inbound from the device)
    Device,
}

/// One unit of editor work: an opaque payload plus its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub origin: WorkOrigin,
    pub payload: Vec<u8>,
}

impl WorkItem {
    pub fn from_ui(payload: Vec<u8>) -> Self {
        Self {
            origin: WorkOrigin::Ui,
            payload,
        }
    }

    pub fn from_device(payload: Vec<u8>) -> Self {
        Self {
            origin: WorkOrigin::Device,
            payload,
        }
    }
}

/// Unbounded FIFO buffer of pending work.
///
/// No backpressure: `push_back` never fails. The editor worker processes one
/// item at a time, so in practice the queue only grows while a dispatch is
/// outstanding.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, item: WorkItem) {
        self.items.push_back(item);
    }

    pub fn pop_front(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Drop all pending items. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}
