use std::time::Duration;

use smol::{channel::Receiver, future, Timer};
use thiserror::Error;

use crate::{types::ItemId, value::Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The target value wasn't reached in time
    #[error("Timed out waiting for {id} to reach its target value")]
    TimedOut {
        id: ItemId,
    },

    /// The item was removed or the dispatcher shut down first
    #[error("Stopped waiting for {id}: item removed or dispatcher stopped")]
    Abandoned {
        id: ItemId,
    },
}

/// Resolves once an item takes a particular value.
///
/// Created by `wait_for`; resolution happens on the dispatcher, after the
/// value is visible in the store.
pub struct ValueWaiter {
    id: ItemId,
    receiver: Receiver<Value>,
}

impl ValueWaiter {
    pub(crate) fn new(id: ItemId, receiver: Receiver<Value>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Non-blocking check
    pub fn try_value(&self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }

    pub async fn resolved(&self) -> Result<Value, WaitError> {
        self.receiver
            .recv()
            .await
            .map_err(|_| WaitError::Abandoned { id: self.id })
    }

    pub fn wait(self) -> Result<Value, WaitError> {
        smol::block_on(self.resolved())
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<Value, WaitError> {
        let id = self.id;
        smol::block_on(future::or(self.resolved(), async move {
            Timer::after(timeout).await;
            Err(WaitError::TimedOut { id })
        }))
    }
}
