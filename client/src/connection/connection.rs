use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{info, trace, warn};
use smol::{channel::Receiver, future, Timer as AsyncTimer};

use tweak_shared::{
    ClientPacketSender, ConnectionState, Features, Message, PendingRequests, RequestId, Timer,
    TransportError, TweakContext, TweakEvent,
};

/// The client's link to its server, shared between the application side
/// and the IO worker
pub struct ServerConnection {
    sender: Box<dyn ClientPacketSender>,
    state: Mutex<ConnectionState>,
    features: Features,
    pending: PendingRequests,
    heartbeat_timer: Mutex<Timer>,
    context: Arc<TweakContext>,
}

impl ServerConnection {
    pub fn new(
        sender: Box<dyn ClientPacketSender>,
        features: Features,
        heartbeat_interval: Duration,
        context: Arc<TweakContext>,
    ) -> Self {
        context.notify(TweakEvent::ConnectionChanged { connected: true });
        Self {
            context,
            sender,
            state: Mutex::new(ConnectionState::Active),
            features,
            pending: PendingRequests::new(),
            heartbeat_timer: Mutex::new(Timer::new(heartbeat_interval)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn send(&self, message: &Message) -> Result<(), TransportError> {
        if !self.state().is_active() {
            return Err(TransportError::ConnectionClosed);
        }
        trace!("-> {:?}", message.kind());
        match self.sender.send(&message.to_bytes()) {
            Ok(()) => {
                lock(&self.heartbeat_timer).reset();
                Ok(())
            }
            Err(err) => {
                warn!("Send to server failed: {}", err);
                self.close(false);
                Err(err)
            }
        }
    }

    pub fn heartbeat_due(&self) -> bool {
        lock(&self.heartbeat_timer).ringing()
    }

    /// Sends a request built around a fresh request id and blocks until
    /// its response arrives, the link closes or `timeout` passes
    pub fn request(
        &self,
        operation: &'static str,
        timeout: Duration,
        build: impl FnOnce(RequestId) -> Message,
    ) -> Result<Message, TransportError> {
        let (request_id, receiver) = self.pending.register()?;
        if let Err(err) = self.send(&build(request_id)) {
            self.pending.cancel(request_id);
            return Err(err);
        }
        let response = smol::block_on(await_response(receiver, operation, timeout));
        if response.is_err() {
            self.pending.cancel(request_id);
        }
        response
    }

    /// Moves the link to `Closed`, fails outstanding requests and reports
    /// the disconnection to the event observer. With `notify`, a final
    /// `Disconnect` goes out first.
    pub fn close(&self, notify: bool) {
        let mut state = lock(&self.state);
        if state.is_closed() {
            return;
        }
        if notify && state.is_active() {
            let _ = self.sender.send(&Message::Disconnect.to_bytes());
        }
        state.close();
        drop(state);

        let failed = self.pending.close();
        if failed > 0 {
            warn!("Connection closed with {} request(s) outstanding", failed);
        }
        self.sender.disconnect();
        self.context
            .notify(TweakEvent::ConnectionChanged { connected: false });
        info!("Disconnected from server");
    }
}

async fn await_response(
    receiver: Receiver<Message>,
    operation: &'static str,
    timeout: Duration,
) -> Result<Message, TransportError> {
    future::or(
        async {
            receiver
                .recv()
                .await
                .map_err(|_| TransportError::ConnectionClosed)
        },
        async {
            AsyncTimer::after(timeout).await;
            Err(TransportError::TimedOut {
                operation,
                waited: timeout,
            })
        },
    )
    .await
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
