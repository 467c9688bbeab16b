//! Simulation events and the bus that carries them out of the tick.
//!
//! Tiles and edit operations emit into the [`EventBus`]; the world calls
//! [`EventBus::deliver`] at the end of each tick and right after each
//! placement or removal. Listeners only observe. Anything that wants to
//! change the world (an order board, a HUD, audio) does so between ticks
//! through the world's own API.
//!
//! Each kind keeps a bounded queue. When a tick produces more events of one
//! kind than the queue holds, the oldest are dropped and counted.

use crate::fixed::Ticks;
use crate::id::ItemId;
use crate::item::ItemType;
use beltworks_spatial::{GridPosition, TileKind};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A spawner created a new item.
    ItemSpawned {
        item: ItemId,
        item_type: ItemType,
        at: GridPosition,
        tick: Ticks,
    },
    /// A sell-pad consumed an item.
    ItemSold {
        item_type: ItemType,
        value: f32,
        amount: u32,
        at: GridPosition,
        tick: Ticks,
    },
    /// A processing machine finished converting an item.
    ItemProcessed {
        machine: TileKind,
        output: ItemType,
        amount: u32,
        at: GridPosition,
        tick: Ticks,
    },
    /// A tile was placed. `kind` is the kind after any automatic upgrade.
    TilePlaced {
        kind: TileKind,
        at: GridPosition,
        tick: Ticks,
    },
    /// A tile was removed.
    TileRemoved {
        kind: TileKind,
        at: GridPosition,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemSpawned,
    ItemSold,
    ItemProcessed,
    TilePlaced,
    TileRemoved,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 5;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemSpawned { .. } => EventKind::ItemSpawned,
            Event::ItemSold { .. } => EventKind::ItemSold,
            Event::ItemProcessed { .. } => EventKind::ItemProcessed,
            Event::TilePlaced { .. } => EventKind::TilePlaced,
            Event::TileRemoved { .. } => EventKind::TileRemoved,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::ItemSpawned,
        EventKind::ItemSold,
        EventKind::ItemProcessed,
        EventKind::TilePlaced,
        EventKind::TileRemoved,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Per-kind queue
// ---------------------------------------------------------------------------

/// Bounded FIFO of undelivered events of one kind.
#[derive(Debug, Default)]
struct KindQueue {
    pending: VecDeque<Event>,
    suppressed: bool,
    emitted: u64,
    dropped: u64,
}

/// A passive listener receives events read-only.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Predicate deciding whether a listener sees an event.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct Subscription {
    kind: EventKind,
    filter: Option<EventFilter>,
    listener: Listener,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EventBus {
    queues: [KindQueue; EVENT_KIND_COUNT],
    /// Delivered in registration order.
    subscriptions: Vec<Subscription>,
    capacity: usize,
}

impl EventBus {
    /// `capacity` bounds each kind's queue between deliveries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: Default::default(),
            subscriptions: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Stop recording `kind`. Anything already queued is discarded.
    pub fn suppress(&mut self, kind: EventKind) {
        let queue = &mut self.queues[kind.index()];
        queue.suppressed = true;
        queue.pending.clear();
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.queues[kind.index()].suppressed
    }

    /// Queue an event for the next delivery.
    pub fn emit(&mut self, event: Event) {
        let queue = &mut self.queues[event.kind().index()];
        if queue.suppressed {
            return;
        }
        if queue.pending.len() == self.capacity {
            queue.pending.pop_front();
            queue.dropped += 1;
        }
        queue.pending.push_back(event);
        queue.emitted += 1;
    }

    /// Listen to every event of `kind`.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.subscriptions.push(Subscription {
            kind,
            filter: None,
            listener,
        });
    }

    /// Listen to events of `kind` that pass `filter`.
    pub fn on_where(&mut self, kind: EventKind, filter: EventFilter, listener: Listener) {
        self.subscriptions.push(Subscription {
            kind,
            filter: Some(filter),
            listener,
        });
    }

    /// Hand every queued event to its listeners, kind by kind and oldest
    /// first, leaving the queues empty.
    pub fn deliver(&mut self) {
        for kind in EventKind::ALL {
            let events = std::mem::take(&mut self.queues[kind.index()].pending);
            if events.is_empty() {
                continue;
            }
            for sub in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
                for event in &events {
                    if sub.filter.as_ref().is_none_or(|keep| keep(event)) {
                        (sub.listener)(event);
                    }
                }
            }
        }
    }

    /// Events of `kind` waiting for delivery.
    pub fn pending(&self, kind: EventKind) -> usize {
        self.queues[kind.index()].pending.len()
    }

    /// Events of `kind` ever recorded, including dropped ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.queues[kind.index()].emitted
    }

    /// Events of `kind` lost to a full queue.
    pub fn dropped(&self, kind: EventKind) -> u64 {
        self.queues[kind.index()].dropped
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
