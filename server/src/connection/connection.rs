use std::collections::HashSet;

use tweak_shared::{
    ConnectionConfig, ConnectionError, ConnectionState, Features, ItemId, PeerKey, Timer,
};

/// Server-side state of one attached client
pub struct Connection {
    pub peer: PeerKey,
    state: ConnectionState,
    features: Features,
    subscriptions: HashSet<ItemId>,
    heartbeat_timer: Timer,
    timeout_timer: Timer,
}

impl Connection {
    /// A transport link that still has to complete its handshake
    pub fn new(peer: PeerKey, config: &ConnectionConfig) -> Self {
        let mut state = ConnectionState::Connecting;
        // the transport link already exists, so we wait for Hello right away
        let _ = state.transition(ConnectionState::Handshaking);
        Self {
            peer,
            state,
            features: Features::none(),
            subscriptions: HashSet::new(),
            heartbeat_timer: Timer::new(config.heartbeat_interval),
            timeout_timer: Timer::new(config.handshake_timeout),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn activate(
        &mut self,
        features: Features,
        config: &ConnectionConfig,
    ) -> Result<(), ConnectionError> {
        self.state.transition(ConnectionState::Active)?;
        self.features = features;
        self.timeout_timer = Timer::new(config.disconnection_timeout_duration);
        Ok(())
    }

    pub fn close(&mut self) {
        self.state.close();
        self.subscriptions.clear();
    }

    // Subscriptions

    pub fn subscribe(&mut self, id: ItemId) {
        self.subscriptions.insert(id);
    }

    pub fn unsubscribe(&mut self, id: ItemId) -> bool {
        self.subscriptions.remove(&id)
    }

    pub fn is_subscribed(&self, id: ItemId) -> bool {
        self.subscriptions.contains(&id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // Liveness

    pub fn mark_heard(&mut self) {
        self.timeout_timer.reset();
    }

    pub fn mark_sent(&mut self) {
        self.heartbeat_timer.reset();
    }

    pub fn should_send_heartbeat(&self) -> bool {
        self.state.is_active() && self.heartbeat_timer.ringing()
    }

    /// Covers both a stalled handshake and a silent active peer
    pub fn timed_out(&self) -> bool {
        self.timeout_timer.ringing()
    }
}
