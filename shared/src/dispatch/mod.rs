mod dispatcher;
mod observer;
mod waiter;

pub use dispatcher::Dispatcher;
pub use observer::{
    CallbackError, CallbackFailure, EventObserver, FnEventObserver, FnObserver, Observer, TweakEvent,
};
pub use waiter::{ValueWaiter, WaitError};
