//! Presentation notifications.
//!
//! Every state change a user-facing layer would redraw for is emitted as an
//! [`Event`] stamped with the virtual time. Emitting is fire-and-forget:
//! events queue until [`EventBus::deliver`] hands them to listeners in
//! emission order. A bounded [`EventHistory`] keeps the most recent events.
//!
//! The undelivered queue is bounded by the same capacity. When nobody
//! delivers for that long the oldest undelivered events are discarded and
//! counted in [`EventBus::undelivered_dropped`].
//!
//! # Suppression
//!
//! Kinds can be suppressed with [`EventBus::suppress`]. Suppressed events
//! are neither queued nor recorded.

use crate::color::Rgb;
use crate::fixed::Millis;
use crate::id::{HallId, IngredientId, MachineId, PotId};
use crate::ingredient::Speed;
use crate::weather::WeatherObservation;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // -- Entities --
    IngredientCreated {
        ingredient: IngredientId,
        at: Millis,
    },
    PotCreated {
        pot: PotId,
        at: Millis,
    },
    PotUpdated {
        pot: PotId,
        ingredient: IngredientId,
        at: Millis,
    },
    IngredientRejected {
        pot: PotId,
        ingredient: IngredientId,
        reason: String,
        at: Millis,
    },
    MachineCreated {
        machine: MachineId,
        hall: HallId,
        speed: Speed,
        at: Millis,
    },
    MachineRejected {
        hall: Option<HallId>,
        reason: String,
        at: Millis,
    },

    // -- Processing --
    PotAssigned {
        pot: PotId,
        machine: MachineId,
        at: Millis,
    },
    AssignRejected {
        pot: PotId,
        machine: MachineId,
        reason: String,
        at: Millis,
    },
    ProcessingStarted {
        machine: MachineId,
        pots: Vec<PotId>,
        /// Time until the last pot of the batch completes.
        duration_ms: Millis,
        at: Millis,
    },
    PotProcessed {
        machine: MachineId,
        pot: PotId,
        mixed_color: Option<Rgb>,
        at: Millis,
    },
    BatchCompleted {
        machine: MachineId,
        at: Millis,
    },

    // -- Environment --
    HallSwitched {
        hall: HallId,
        at: Millis,
    },
    WeatherUpdated {
        observation: WeatherObservation,
        at: Millis,
    },
    WeatherUnavailable {
        message: String,
        at: Millis,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IngredientCreated,
    PotCreated,
    PotUpdated,
    IngredientRejected,
    MachineCreated,
    MachineRejected,
    PotAssigned,
    AssignRejected,
    ProcessingStarted,
    PotProcessed,
    BatchCompleted,
    HallSwitched,
    WeatherUpdated,
    WeatherUnavailable,
}

const EVENT_KIND_COUNT: usize = 14;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::IngredientCreated { .. } => EventKind::IngredientCreated,
            Event::PotCreated { .. } => EventKind::PotCreated,
            Event::PotUpdated { .. } => EventKind::PotUpdated,
            Event::IngredientRejected { .. } => EventKind::IngredientRejected,
            Event::MachineCreated { .. } => EventKind::MachineCreated,
            Event::MachineRejected { .. } => EventKind::MachineRejected,
            Event::PotAssigned { .. } => EventKind::PotAssigned,
            Event::AssignRejected { .. } => EventKind::AssignRejected,
            Event::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            Event::PotProcessed { .. } => EventKind::PotProcessed,
            Event::BatchCompleted { .. } => EventKind::BatchCompleted,
            Event::HallSwitched { .. } => EventKind::HallSwitched,
            Event::WeatherUpdated { .. } => EventKind::WeatherUpdated,
            Event::WeatherUnavailable { .. } => EventKind::WeatherUnavailable,
        }
    }

    /// Virtual time the event was emitted at.
    pub fn at(&self) -> Millis {
        match self {
            Event::IngredientCreated { at, .. }
            | Event::PotCreated { at, .. }
            | Event::PotUpdated { at, .. }
            | Event::IngredientRejected { at, .. }
            | Event::MachineCreated { at, .. }
            | Event::MachineRejected { at, .. }
            | Event::PotAssigned { at, .. }
            | Event::AssignRejected { at, .. }
            | Event::ProcessingStarted { at, .. }
            | Event::PotProcessed { at, .. }
            | Event::BatchCompleted { at, .. }
            | Event::HallSwitched { at, .. }
            | Event::WeatherUpdated { at, .. }
            | Event::WeatherUnavailable { at, .. } => *at,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// The most recent events, oldest first. Once `capacity` is reached each
/// new event evicts the oldest one.
#[derive(Debug, Clone)]
pub struct EventHistory {
    events: VecDeque<Event>,
    capacity: usize,
    evicted: u64,
}

impl EventHistory {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn record(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events evicted since the last [`clear`](Self::clear).
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.evicted = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate that narrows what a listener sees.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    /// `None` listens to every kind.
    kind: Option<EventKind>,
    listener: PassiveListener,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl SubscriberEntry {
    fn wants(&self, event: &Event) -> bool {
        self.kind.is_none_or(|k| k == event.kind())
            && self.filter.as_ref().is_none_or(|f| f(event))
    }
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

pub struct EventBus {
    /// Emitted but not yet delivered, in emission order.
    queue: VecDeque<Event>,
    queue_capacity: usize,
    undelivered_dropped: u64,
    history: EventHistory,
    suppressed: [bool; EVENT_KIND_COUNT],
    emitted: [u64; EVENT_KIND_COUNT],
    subscribers: Vec<SubscriberEntry>,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue.len())
            .field("history", &self.history.len())
            .field("suppressed", &self.suppressed)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// `history_capacity` bounds both the retained history and the
    /// undelivered queue.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queue_capacity: history_capacity.max(1),
            undelivered_dropped: 0,
            history: EventHistory::new(history_capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            emitted: [0; EVENT_KIND_COUNT],
            subscribers: Vec::new(),
            next_insertion_order: 0,
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Queue an event for delivery and record it. No-op when suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        self.emitted[idx] += 1;
        self.history.record(event.clone());
        if self.queue.len() == self.queue_capacity {
            self.queue.pop_front();
            self.undelivered_dropped += 1;
        }
        self.queue.push_back(event);
    }

    /// Listen to one kind with normal priority.
    pub fn on(&mut self, kind: EventKind, listener: PassiveListener) {
        self.subscribe(Some(kind), SubscriberPriority::Normal, None, listener);
    }

    /// Listen to every kind with normal priority.
    pub fn on_any(&mut self, listener: PassiveListener) {
        self.subscribe(None, SubscriberPriority::Normal, None, listener);
    }

    pub fn subscribe(
        &mut self,
        kind: Option<EventKind>,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.subscribers.push(SubscriberEntry {
            kind,
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        self.subscribers
            .sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Hand every queued event to the interested listeners, oldest first.
    /// Within one event, listeners run by `(priority, registration order)`.
    /// Returns the number of events delivered.
    pub fn deliver(&mut self) -> usize {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            for entry in &mut self.subscribers {
                if entry.wants(event) {
                    (entry.listener)(event);
                }
            }
        }
        events.len()
    }

    /// Events emitted but not yet delivered.
    pub fn queued(&self) -> &VecDeque<Event> {
        &self.queue
    }

    /// Events discarded from a full queue before anyone delivered them.
    pub fn undelivered_dropped(&self) -> u64 {
        self.undelivered_dropped
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    /// Events of one kind still in the history, oldest first.
    pub fn history_of(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.history.iter().filter(move |e| e.kind() == kind)
    }

    /// Total events ever emitted for a kind (including ones since evicted).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    /// Drop the queue and history. Listeners and suppression stay.
    pub fn clear_all(&mut self) {
        self.queue.clear();
        self.undelivered_dropped = 0;
        self.history.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
