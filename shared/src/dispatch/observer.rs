use std::fmt;

use thiserror::Error;

use crate::{types::ItemId, value::Value};

/// Error an observer returns to report that it couldn't handle a change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why an observer invocation failed. Recorded by the dispatcher, never
/// propagated to whoever made the change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackFailure {
    #[error("Observer of {id} returned an error: {error}")]
    Returned {
        id: ItemId,
        error: CallbackError,
    },

    #[error("Observer of {id} panicked: {message}")]
    Panicked {
        id: ItemId,
        message: String,
    },

    #[error("Event observer returned an error on {event}: {error}")]
    EventReturned {
        event: TweakEvent,
        error: CallbackError,
    },

    #[error("Event observer panicked on {event}: {message}")]
    EventPanicked {
        event: TweakEvent,
        message: String,
    },
}

impl CallbackFailure {
    /// The item whose observer failed, `None` for event observers
    pub fn id(&self) -> Option<ItemId> {
        match self {
            CallbackFailure::Returned { id, .. } | CallbackFailure::Panicked { id, .. } => Some(*id),
            CallbackFailure::EventReturned { .. } | CallbackFailure::EventPanicked { .. } => None,
        }
    }
}

/// Receives committed changes of one item, on the dispatcher's worker thread
pub trait Observer: Send + Sync {
    fn on_change(&self, id: ItemId, value: &Value) -> Result<(), CallbackError>;
}

/// Adapts a closure into an [`Observer`]
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(ItemId, &Value) -> Result<(), CallbackError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(ItemId, &Value) -> Result<(), CallbackError> + Send + Sync,
{
    fn on_change(&self, id: ItemId, value: &Value) -> Result<(), CallbackError> {
        (self.0)(id, value)
    }
}

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnObserver")
    }
}

/// Something that happened to an endpoint as a whole rather than to one
/// item's value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweakEvent {
    /// The link to the server came up, or went away for good
    ConnectionChanged { connected: bool },
    /// An item appeared in the mirror
    ItemAdded(ItemId),
    /// The server removed an item the mirror held
    ItemRemoved(ItemId),
}

impl fmt::Display for TweakEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TweakEvent::ConnectionChanged { connected: true } => f.write_str("connected"),
            TweakEvent::ConnectionChanged { connected: false } => f.write_str("disconnected"),
            TweakEvent::ItemAdded(id) => write!(f, "added {}", id),
            TweakEvent::ItemRemoved(id) => write!(f, "removed {}", id),
        }
    }
}

/// Receives [`TweakEvent`]s on the dispatcher's worker thread
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: TweakEvent) -> Result<(), CallbackError>;
}

/// Adapts a closure into an [`EventObserver`]
pub struct FnEventObserver<F>(F);

impl<F> FnEventObserver<F>
where
    F: Fn(TweakEvent) -> Result<(), CallbackError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> EventObserver for FnEventObserver<F>
where
    F: Fn(TweakEvent) -> Result<(), CallbackError> + Send + Sync,
{
    fn on_event(&self, event: TweakEvent) -> Result<(), CallbackError> {
        (self.0)(event)
    }
}

impl<F> fmt::Debug for FnEventObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEventObserver")
    }
}
