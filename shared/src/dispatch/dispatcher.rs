use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle, ThreadId},
};

use log::{debug, trace, warn};
use smol::channel::{self, Receiver, Sender};

use super::{CallbackError, CallbackFailure, EventObserver, TweakEvent, ValueWaiter};
use crate::{store::Change, types::ItemId, value::Value};

enum DispatchEvent {
    Change(Change),
    Event(TweakEvent),
    Removed(ItemId),
    Flush(Sender<()>),
}

struct WaiterEntry {
    target: Value,
    sender: Sender<Value>,
}

#[derive(Default)]
struct DispatchShared {
    waiters: Mutex<HashMap<ItemId, Vec<WaiterEntry>>>,
    event_observer: Mutex<Option<Arc<dyn EventObserver>>>,
    delivered: AtomicU64,
    failures: AtomicU64,
    last_failure: Mutex<Option<CallbackFailure>>,
}

/// Runs `callback`, turning a panic into its message
fn guarded(
    callback: impl FnOnce() -> Result<(), CallbackError>,
) -> Result<Result<(), CallbackError>, String> {
    panic::catch_unwind(AssertUnwindSafe(callback))
        .map_err(|payload| panic_message(payload.as_ref()))
}

impl DispatchShared {
    fn invoke(&self, change: &Change) {
        let Some(observer) = &change.observer else {
            return;
        };
        let failure = match guarded(|| observer.on_change(change.id, &change.value)) {
            Ok(Ok(())) => return self.succeeded(),
            Ok(Err(error)) => CallbackFailure::Returned {
                id: change.id,
                error,
            },
            Err(message) => CallbackFailure::Panicked {
                id: change.id,
                message,
            },
        };
        self.failed(failure);
    }

    fn notify(&self, event: TweakEvent) {
        let observer = self
            .event_observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            trace!("No event observer for {}", event);
            return;
        };
        let failure = match guarded(|| observer.on_event(event)) {
            Ok(Ok(())) => return self.succeeded(),
            Ok(Err(error)) => CallbackFailure::EventReturned { event, error },
            Err(message) => CallbackFailure::EventPanicked { event, message },
        };
        self.failed(failure);
    }

    fn succeeded(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn failed(&self, failure: CallbackFailure) {
        warn!("{}", failure);
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    fn resolve_waiters(&self, change: &Change) {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = waiters.get_mut(&change.id) else {
            return;
        };
        entries.retain(|entry| {
            if entry.sender.is_closed() {
                return false;
            }
            if entry.target == change.value {
                let _ = entry.sender.try_send(change.value.clone());
                return false;
            }
            true
        });
        if entries.is_empty() {
            waiters.remove(&change.id);
        }
    }

    fn abandon_waiters(&self, id: ItemId) {
        // dropping the senders wakes every waiter with Abandoned
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Delivers committed changes to observers on a dedicated worker thread.
///
/// Observers run in the order their changes were enqueued, except that a
/// change older than one already delivered for the same item is skipped.
/// An observer that returns an error or panics is logged and counted; the
/// worker carries on and that observer is called again on the item's next
/// change.
pub struct Dispatcher {
    sender: Sender<DispatchEvent>,
    shared: Arc<DispatchShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        let shared = Arc::new(DispatchShared::default());
        let worker_shared = shared.clone();
        let handle = thread::spawn(move || run(receiver, worker_shared));
        let worker_id = handle.thread().id();
        Self {
            sender,
            shared,
            worker: Mutex::new(Some(handle)),
            worker_id,
        }
    }

    /// Queues a change for delivery. Never blocks, never runs observers inline.
    pub fn enqueue(&self, change: Change) {
        trace!("Enqueue {} revision {}", change.id, change.revision);
        if self.sender.try_send(DispatchEvent::Change(change)).is_err() {
            debug!("Dispatcher stopped, change dropped");
        }
    }

    /// Queues an endpoint event for the event observer, if one is set
    pub fn notify(&self, event: TweakEvent) {
        trace!("Enqueue event {}", event);
        if self.sender.try_send(DispatchEvent::Event(event)).is_err() {
            debug!("Dispatcher stopped, event dropped");
        }
    }

    /// Replaces the event observer. Events already queued go to whichever
    /// observer is set when they are delivered.
    pub fn set_event_observer(&self, observer: Option<Arc<dyn EventObserver>>) {
        *self
            .shared
            .event_observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// Abandons outstanding waiters of a removed item, after any changes
    /// already queued for it.
    pub fn item_removed(&self, id: ItemId) {
        let _ = self.sender.try_send(DispatchEvent::Removed(id));
    }

    /// Blocks until everything enqueued before this call has been delivered.
    /// Returns immediately when called from an observer.
    pub fn flush(&self) {
        if thread::current().id() == self.worker_id {
            return;
        }
        let (done_sender, done_receiver) = channel::bounded(1);
        if self.sender.try_send(DispatchEvent::Flush(done_sender)).is_ok() {
            let _ = done_receiver.recv_blocking();
        }
    }

    pub(crate) fn register_waiter(&self, id: ItemId, target: Value) -> (ValueWaiter, Sender<Value>) {
        let (sender, receiver) = channel::bounded(1);
        self.shared
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_default()
            .push(WaiterEntry {
                target,
                sender: sender.clone(),
            });
        (ValueWaiter::new(id, receiver), sender)
    }

    /// Successful observer invocations so far
    pub fn delivered_count(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Failed observer invocations so far
    pub fn failure_count(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    pub fn last_failure(&self) -> Option<CallbackFailure> {
        self.shared
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.sender.close();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // an observer may hold the last reference to us
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run(receiver: Receiver<DispatchEvent>, shared: Arc<DispatchShared>) {
    // committers race to enqueue, so a change can arrive after a newer one
    let mut delivered_revisions: HashMap<ItemId, u64> = HashMap::new();
    while let Ok(event) = receiver.recv_blocking() {
        match event {
            DispatchEvent::Change(change) => {
                match delivered_revisions.get(&change.id) {
                    Some(&delivered) if change.revision <= delivered => {
                        trace!(
                            "Skipping stale {} revision {} (delivered {})",
                            change.id,
                            change.revision,
                            delivered
                        );
                        continue;
                    }
                    _ => {}
                }
                delivered_revisions.insert(change.id, change.revision);
                shared.invoke(&change);
                shared.resolve_waiters(&change);
            }
            DispatchEvent::Event(event) => shared.notify(event),
            DispatchEvent::Removed(id) => {
                delivered_revisions.remove(&id);
                shared.abandon_waiters(id);
            }
            DispatchEvent::Flush(done) => {
                let _ = done.try_send(());
            }
        }
    }
    shared
        .waiters
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
    debug!("Dispatcher stopped");
}
