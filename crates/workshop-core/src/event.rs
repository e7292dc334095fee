//! World events, buffered per kind and delivered once per advance.
//!
//! Cards, generators and stations emit while the world advances (and drag
//! and drop emits between advances); the post-tick phase hands everything to
//! subscribers in one batch. Each kind has its own bounded [`EventBuffer`].
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, used for presentation, audio, analytics.
//! - **Reactive handlers**: return mutations applied at the start of the next
//!   advance.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]. Suppressed kinds
//! are never buffered.

use std::collections::{VecDeque, vec_deque};

use crate::card::CardSpec;
use crate::fixed::{Fixed64, Seconds};
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why staged inputs were handed back to the table instead of consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnReason {
    /// Processing was cancelled by the player.
    Cancelled,
    /// One of the inputs decayed while being processed.
    InputDecayed,
    /// An input was destroyed from outside while being processed.
    InputDestroyed,
    /// The station sat in `Accumulating` longer than the configured timeout.
    StallTimeout,
}

/// A world event. All events carry the simulation time at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Cards --
    CardCreated {
        card: CardId,
        title: String,
        at: Seconds,
    },
    CardDecaying {
        card: CardId,
        at: Seconds,
    },
    CardDestroyed {
        card: CardId,
        title: String,
        at: Seconds,
    },

    // -- Generators --
    CardGenerated {
        generator: GeneratorId,
        card: CardId,
        at: Seconds,
    },
    GenerationBlocked {
        generator: GeneratorId,
        at: Seconds,
    },

    // -- Stations --
    CardAccepted {
        station: StationId,
        card: CardId,
        at: Seconds,
    },
    InvalidCombination {
        station: StationId,
        titles: Vec<String>,
        at: Seconds,
    },
    ProcessingStarted {
        station: StationId,
        recipe: RecipeId,
        at: Seconds,
    },
    ProcessingProgress {
        station: StationId,
        progress: Fixed64,
        at: Seconds,
    },
    RecipeCompleted {
        station: StationId,
        recipe: RecipeId,
        at: Seconds,
    },
    InputsReturned {
        station: StationId,
        cards: Vec<CardId>,
        reason: ReturnReason,
        at: Seconds,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CardCreated,
    CardDecaying,
    CardDestroyed,
    CardGenerated,
    GenerationBlocked,
    CardAccepted,
    InvalidCombination,
    ProcessingStarted,
    ProcessingProgress,
    RecipeCompleted,
    InputsReturned,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 11;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CardCreated { .. } => EventKind::CardCreated,
            Event::CardDecaying { .. } => EventKind::CardDecaying,
            Event::CardDestroyed { .. } => EventKind::CardDestroyed,
            Event::CardGenerated { .. } => EventKind::CardGenerated,
            Event::GenerationBlocked { .. } => EventKind::GenerationBlocked,
            Event::CardAccepted { .. } => EventKind::CardAccepted,
            Event::InvalidCombination { .. } => EventKind::InvalidCombination,
            Event::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            Event::ProcessingProgress { .. } => EventKind::ProcessingProgress,
            Event::RecipeCompleted { .. } => EventKind::RecipeCompleted,
            Event::InputsReturned { .. } => EventKind::InputsReturned,
        }
    }

    /// Simulation time the event happened at.
    pub fn at(&self) -> Seconds {
        match self {
            Event::CardCreated { at, .. }
            | Event::CardDecaying { at, .. }
            | Event::CardDestroyed { at, .. }
            | Event::CardGenerated { at, .. }
            | Event::GenerationBlocked { at, .. }
            | Event::CardAccepted { at, .. }
            | Event::InvalidCombination { at, .. }
            | Event::ProcessingStarted { at, .. }
            | Event::ProcessingProgress { at, .. }
            | Event::RecipeCompleted { at, .. }
            | Event::InputsReturned { at, .. } => *at,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Mutations (returned by reactive handlers)
// ---------------------------------------------------------------------------

/// A mutation that a reactive handler wants applied at the start of the next
/// advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMutation {
    CreateCard(CardSpec),
    DestroyCard(CardId),
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Bounded per-kind event queue. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    queue: VecDeque<Event>,
    capacity: usize,
    total_written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Every event pushed so far, dropped ones included.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, Event> {
        self.queue.iter()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn take_all(&mut self) -> Vec<Event> {
        self.queue.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Receives an event and returns zero or more mutations for the next advance.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<EventMutation>>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Delivery order within one event kind. `Pre` runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre,
    Normal,
    Post,
}

enum Handler {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

struct Subscription {
    handler: Handler,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
}

/// Buffer, suppression flag and subscribers for one event kind.
#[derive(Default)]
struct Channel {
    buffer: Option<EventBuffer>,
    suppressed: bool,
    /// Sorted by priority; registration order within a priority.
    subscribers: Vec<Subscription>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let passive = self
            .subscribers
            .iter()
            .filter(|s| matches!(s.handler, Handler::Passive(_)))
            .count();
        f.debug_struct("Channel")
            .field("buffered", &self.buffer.as_ref().map_or(0, EventBuffer::len))
            .field("suppressed", &self.suppressed)
            .field("passive", &passive)
            .field("reactive", &(self.subscribers.len() - passive))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One channel per event kind plus the mutations reactive handlers queued.
#[derive(Debug)]
pub struct EventBus {
    channels: [Channel; EVENT_KIND_COUNT],
    /// Drained by the world at the start of the next advance.
    pending_mutations: Vec<EventMutation>,
    default_capacity: usize,
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| Channel::default()),
            pending_mutations: Vec::new(),
            default_capacity,
        }
    }

    fn channel(&self, kind: EventKind) -> &Channel {
        &self.channels[kind.index()]
    }

    /// Stop buffering a kind. Anything already buffered is discarded.
    pub fn suppress(&mut self, kind: EventKind) {
        let channel = &mut self.channels[kind.index()];
        channel.suppressed = true;
        channel.buffer = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.channels[kind.index()].suppressed = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.channel(kind).suppressed
    }

    /// Buffer an event for the next delivery.
    pub fn emit(&mut self, event: Event) {
        let capacity = self.default_capacity;
        let channel = &mut self.channels[event.kind().index()];
        if channel.suppressed {
            return;
        }
        channel
            .buffer
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.on_reactive_filtered(kind, SubscriberPriority::Normal, None, handler);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.subscribe(kind, priority, filter, Handler::Passive(listener));
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) {
        self.subscribe(kind, priority, filter, Handler::Reactive(handler));
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: Handler,
    ) {
        let subscribers = &mut self.channels[kind.index()].subscribers;
        let at = subscribers.partition_point(|s| s.priority <= priority);
        subscribers.insert(
            at,
            Subscription {
                handler,
                priority,
                filter,
            },
        );
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.channel(kind).subscribers.len()
    }

    /// Hand every buffered event to its subscribers and empty the buffers.
    ///
    /// Kinds go in declaration order. Within a kind, each subscriber sees the
    /// events oldest first. Reactive mutations pile up until
    /// [`drain_mutations`](EventBus::drain_mutations).
    pub fn deliver(&mut self) {
        for channel in &mut self.channels {
            if channel.suppressed {
                continue;
            }
            let events = match channel.buffer.as_mut() {
                Some(buffer) if !buffer.is_empty() => buffer.take_all(),
                _ => continue,
            };
            for Subscription { handler, filter, .. } in &mut channel.subscribers {
                let wanted = events.iter().filter(|e| filter.as_ref().is_none_or(|f| f(*e)));
                for event in wanted {
                    match handler {
                        Handler::Passive(listener) => listener(event),
                        Handler::Reactive(handler) => {
                            self.pending_mutations.extend(handler(event));
                        }
                    }
                }
            }
        }
    }

    pub fn drain_mutations(&mut self) -> Vec<EventMutation> {
        std::mem::take(&mut self.pending_mutations)
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.channel(kind).buffer.as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Empty every buffer and forget queued mutations. Subscribers and
    /// suppression are kept.
    pub fn clear_all(&mut self) {
        for buffer in self.channels.iter_mut().filter_map(|c| c.buffer.as_mut()) {
            buffer.clear();
        }
        self.pending_mutations.clear();
    }

    pub fn pending_mutation_count(&self) -> usize {
        self.pending_mutations.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
