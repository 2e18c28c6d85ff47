//! Lab events and the fixed-capacity ring buffer that records them.
//!
//! The manager pushes an event whenever its state changes or it emits work.
//! The buffer never grows: once full, the oldest event is dropped. Drivers
//! drain it once per step (or whenever convenient) with
//! [`EventBuffer::drain`].

use crate::compound::Compound;
use crate::fixed::Ticks;
use crate::id::{HaulerId, LabId};
use crate::reaction::Direction;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something the lab manager did. All events carry the tick they occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabEvent {
    // -- Layout --
    FeedersAssigned {
        input1: LabId,
        input2: LabId,
        tick: Ticks,
    },
    FeedersCleared {
        tick: Ticks,
    },

    // -- Planning --
    DeficitsRefreshed {
        /// Compounds with a positive deficit.
        compounds: usize,
        tick: Ticks,
    },
    ReactionSelected {
        output: Compound,
        direction: Direction,
        target_amount: u32,
        tick: Ticks,
    },
    ReactionIdle {
        snooze_until: Ticks,
        tick: Ticks,
    },

    // -- Work --
    ReactionCommanded {
        output: Compound,
        labs: usize,
        tick: Ticks,
    },
    ReservationIssued {
        hauler: HaulerId,
        reservations: usize,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabEventKind {
    FeedersAssigned,
    FeedersCleared,
    DeficitsRefreshed,
    ReactionSelected,
    ReactionIdle,
    ReactionCommanded,
    ReservationIssued,
}

impl LabEvent {
    pub fn kind(&self) -> LabEventKind {
        match self {
            LabEvent::FeedersAssigned { .. } => LabEventKind::FeedersAssigned,
            LabEvent::FeedersCleared { .. } => LabEventKind::FeedersCleared,
            LabEvent::DeficitsRefreshed { .. } => LabEventKind::DeficitsRefreshed,
            LabEvent::ReactionSelected { .. } => LabEventKind::ReactionSelected,
            LabEvent::ReactionIdle { .. } => LabEventKind::ReactionIdle,
            LabEvent::ReactionCommanded { .. } => LabEventKind::ReactionCommanded,
            LabEvent::ReservationIssued { .. } => LabEventKind::ReservationIssued,
        }
    }

    pub fn tick(&self) -> Ticks {
        match *self {
            LabEvent::FeedersAssigned { tick, .. }
            | LabEvent::FeedersCleared { tick }
            | LabEvent::DeficitsRefreshed { tick, .. }
            | LabEvent::ReactionSelected { tick, .. }
            | LabEvent::ReactionIdle { tick, .. }
            | LabEvent::ReactionCommanded { tick, .. }
            | LabEvent::ReservationIssued { tick, .. } => tick,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Pre-allocated ring buffer. Fixed capacity; when full, the oldest event
/// is overwritten.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    slots: Vec<Option<LabEvent>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Lifetime count, including overwritten events.
    total_written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: LabEvent) {
        if self.len == self.capacity() {
            self.dropped += 1;
        } else {
            self.len += 1;
        }
        self.slots[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten before anyone drained them.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest slot index.
    fn start(&self) -> usize {
        (self.head + self.capacity() - self.len) % self.capacity()
    }

    /// Events from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        EventBufferIter {
            buffer: self,
            index: self.start(),
            remaining: self.len,
        }
    }

    /// Remove and return every buffered event, oldest first.
    pub fn drain(&mut self) -> Vec<LabEvent> {
        let start = self.start();
        let cap = self.capacity();
        let events = (0..self.len)
            .filter_map(|i| self.slots[(start + i) % cap].take())
            .collect();
        self.head = 0;
        self.len = 0;
        events
    }

    /// Drop every buffered event. The lifetime count is kept.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over an [`EventBuffer`], oldest first.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a LabEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.slots[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}
