use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::trace;
use smol::channel::{self, Receiver, Sender};

use crate::{protocol::Message, transport::TransportError, types::RequestId};

struct PendingInner {
    waiting: HashMap<RequestId, Sender<Message>>,
    next_id: RequestId,
    closed: bool,
}

/// Outstanding requests of one connection, keyed by request id.
///
/// Each registered request gets a receiver for its response. Closing the
/// table drops every sender, so all waiters observe a closed channel.
pub struct PendingRequests {
    inner: Mutex<PendingInner>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PendingInner {
                waiting: HashMap::new(),
                next_id: RequestId::new(1),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self) -> Result<(RequestId, Receiver<Message>), TransportError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::ConnectionClosed);
        }
        let request_id = inner.next_id;
        inner.next_id = request_id.next();
        let (sender, receiver) = channel::bounded(1);
        inner.waiting.insert(request_id, sender);
        Ok((request_id, receiver))
    }

    /// Hands a response to its waiter. Returns false if nobody was waiting.
    pub fn resolve(&self, response: Message) -> bool {
        let Some(request_id) = response.response_to() else {
            return false;
        };
        let Some(sender) = self.lock().waiting.remove(&request_id) else {
            trace!("No request waiting for response {:?}", request_id);
            return false;
        };
        sender.try_send(response).is_ok()
    }

    pub fn cancel(&self, request_id: RequestId) {
        self.lock().waiting.remove(&request_id);
    }

    /// Fails every outstanding request and refuses new ones.
    /// Returns how many were outstanding.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        let count = inner.waiting.len();
        inner.waiting.clear();
        count
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}
