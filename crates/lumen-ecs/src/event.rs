//! Synchronous event bus.
//!
//! Events are identified by an [`EventId`] and carry a map of
//! [`ParamId`] -> type-erased value. Both ids are 32-bit FNV-1a hashes of a
//! name string, computed at compile time with [`EventId::from_name`] /
//! [`ParamId::from_name`], so senders and receivers agree on keys without a
//! shared registry:
//!
//! ```
//! use lumen_ecs::event::{Event, EventId, EventManager, ParamId};
//!
//! const PING: EventId = EventId::from_name("Demo::PING");
//! const COUNT: ParamId = ParamId::from_name("Demo::Ping::COUNT");
//!
//! let mut events = EventManager::new();
//! events.add_listener(PING, |event| {
//!     let count = *event.param::<u32>(COUNT).unwrap();
//!     event.set_param(COUNT, count + 1);
//! });
//!
//! let mut event = Event::new(PING).with_param(COUNT, 41u32);
//! events.send_event(&mut event);
//! assert_eq!(event.param::<u32>(COUNT).unwrap(), &42);
//! ```
//!
//! Distinct names that hash to the same id are indistinguishable.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `name`.
pub const fn fnv1a_32(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identifier of an event kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u32);

impl EventId {
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a_32(name))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({:#010x})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Identifier of an event parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u32);

impl ParamId {
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a_32(name))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamId({:#010x})", self.0)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reading event parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The event carries no value under `param`.
    #[error("event {event} has no parameter {param}")]
    MissingParam { event: EventId, param: ParamId },

    /// The value under `param` is not of the requested type.
    #[error("parameter {param} of event {event} is not a `{expected}`")]
    ParamTypeMismatch {
        event: EventId,
        param: ParamId,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An event instance: its id plus a type-erased parameter map.
pub struct Event {
    id: EventId,
    params: HashMap<ParamId, Box<dyn Any>>,
}

impl Event {
    /// A payload-less event.
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            params: HashMap::new(),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Builder form of [`set_param`](Self::set_param).
    pub fn with_param<T: 'static>(mut self, param: ParamId, value: T) -> Self {
        self.set_param(param, value);
        self
    }

    /// Store `value` under `param`, replacing any previous value.
    pub fn set_param<T: 'static>(&mut self, param: ParamId, value: T) {
        self.params.insert(param, Box::new(value));
    }

    /// Read `param` as a `T`.
    pub fn param<T: 'static>(&self, param: ParamId) -> Result<&T, EventError> {
        let value = self.params.get(&param).ok_or(EventError::MissingParam {
            event: self.id,
            param,
        })?;
        value
            .downcast_ref::<T>()
            .ok_or(EventError::ParamTypeMismatch {
                event: self.id,
                param,
                expected: type_name::<T>(),
            })
    }

    /// Mutable access to `param` as a `T`.
    pub fn param_mut<T: 'static>(&mut self, param: ParamId) -> Result<&mut T, EventError> {
        let event = self.id;
        let value = self
            .params
            .get_mut(&param)
            .ok_or(EventError::MissingParam { event, param })?;
        value
            .downcast_mut::<T>()
            .ok_or(EventError::ParamTypeMismatch {
                event,
                param,
                expected: type_name::<T>(),
            })
    }

    pub fn has_param(&self, param: ParamId) -> bool {
        self.params.contains_key(&param)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventManager
// ---------------------------------------------------------------------------

/// A boxed event listener.
pub type Listener = Box<dyn FnMut(&mut Event)>;

/// Per-event-id listener lists with ordered, synchronous dispatch.
#[derive(Default)]
pub struct EventManager {
    listeners: HashMap<EventId, Vec<Listener>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `listener` to `id`. Listeners stay registered for the manager's
    /// lifetime.
    pub fn add_listener<F>(&mut self, id: EventId, listener: F)
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.listeners.entry(id).or_default().push(Box::new(listener));
    }

    /// Invoke every listener bound to `event.id()`, in registration order.
    ///
    /// Dispatching an id nobody listens to does nothing.
    pub fn send_event(&mut self, event: &mut Event) {
        let Some(listeners) = self.listeners.get_mut(&event.id) else {
            return;
        };
        tracing::trace!(event = %event.id, listeners = listeners.len(), "dispatching event");
        for listener in listeners.iter_mut() {
            listener(&mut *event);
        }
    }

    /// Dispatch a payload-less event.
    pub fn send_event_id(&mut self, id: EventId) {
        let mut event = Event::new(id);
        self.send_event(&mut event);
    }

    /// Number of listeners bound to `id`.
    pub fn listener_count(&self, id: EventId) -> usize {
        self.listeners.get(&id).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("event_kinds", &self.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
