use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::{ItemRange, LoadError, LoadOperation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    LoadStart,
    LoadEnd,
    Error,
    RangeChange,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::LoadStart => "load:start",
            Self::LoadEnd => "load:end",
            Self::Error => "error",
            Self::RangeChange => "range:change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A signal for code outside the core: loading indicators, error banners, analytics.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    LoadStart {
        operation: LoadOperation,
        offset: usize,
        limit: usize,
    },
    /// Items are already in the store when this fires.
    LoadEnd {
        operation: LoadOperation,
        offset: usize,
        count: usize,
        total: Option<usize>,
    },
    Error {
        error: LoadError,
        offset: usize,
        limit: usize,
    },
    RangeChange {
        range: Option<ItemRange>,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LoadStart { .. } => EventKind::LoadStart,
            Self::LoadEnd { .. } => EventKind::LoadEnd,
            Self::Error { .. } => EventKind::Error,
            Self::RangeChange { .. } => EventKind::RangeChange,
        }
    }
}

/// A failure reported by an event handler. It is logged and never propagated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("event handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Handler = Rc<dyn Fn(&Event) -> Result<(), HandlerError>>;

/// Returned by [`EventEmitter::on`]; pass it to [`EventEmitter::off`] to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Entry {
    kind: EventKind,
    id: u64,
    handler: Handler,
}

/// An ordered publish/subscribe registry.
///
/// All methods take `&self`: handlers may subscribe, unsubscribe or emit while being dispatched.
/// Dispatch runs over a snapshot of the handlers registered when `emit` was called.
#[derive(Default)]
pub struct EventEmitter {
    entries: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) -> Result<(), HandlerError> + 'static,
    ) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        self.entries.borrow_mut().push(Entry {
            kind,
            id,
            handler: Rc::new(handler),
        });
        Subscription { kind, id }
    }

    /// Returns `false` if the subscription was already removed.
    pub fn off(&self, subscription: Subscription) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.id != subscription.id);
        entries.len() != before
    }

    /// Runs every handler for the event's kind in subscription order.
    ///
    /// Returns the number of handlers that failed; the others still ran.
    pub fn emit(&self, event: &Event) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| Rc::clone(&e.handler))
            .collect();

        let mut failures = 0;
        for handler in handlers {
            if let Err(_err) = handler(event) {
                failures += 1;
                vwarn!(event = kind.name(), error = %_err, "event handler failed");
            }
        }
        failures
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.entries.borrow().len())
            .finish()
    }
}
