use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, trace, warn};
use smol::{channel::Receiver, future, stream::StreamExt, Timer};

use tweak_shared::{
    Change, CollectEntry, Features, ItemId, ItemKey, Message, PeerKey, ProtocolError, RequestId,
    Role, ServerPacketSender, ServerSocketEvent, StoreError, TweakContext, UriPattern, Value,
    PROTOCOL_VERSION,
};

use crate::{connection::connection::Connection, ServerConfig};

/// Work handed to the IO worker by the application side of the server
pub(crate) enum ServerJob {
    /// The item went dirty and its latest value must reach subscribers
    Push(ItemId),
    Removed(ItemId),
    Shutdown,
}

enum Input {
    Socket(ServerSocketEvent),
    SocketClosed,
    Job(ServerJob),
    Tick,
}

/// Owns every connection. Runs on its own thread, see [`ServerWorker::run`].
pub(crate) struct ServerWorker {
    context: Arc<TweakContext>,
    config: ServerConfig,
    sender: Box<dyn ServerPacketSender>,
    connections: HashMap<PeerKey, Connection>,
    connection_count: Arc<AtomicUsize>,
}

impl ServerWorker {
    pub fn new(
        context: Arc<TweakContext>,
        config: ServerConfig,
        sender: Box<dyn ServerPacketSender>,
        connection_count: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            context,
            config,
            sender,
            connections: HashMap::new(),
            connection_count,
        }
    }

    pub fn run(mut self, socket_events: Receiver<ServerSocketEvent>, jobs: Receiver<ServerJob>) {
        smol::block_on(async {
            let mut ticker = Timer::interval(self.tick_interval());
            loop {
                let input = future::or(
                    async {
                        match socket_events.recv().await {
                            Ok(event) => Input::Socket(event),
                            Err(_) => Input::SocketClosed,
                        }
                    },
                    future::or(
                        async {
                            match jobs.recv().await {
                                Ok(job) => Input::Job(job),
                                Err(_) => Input::Job(ServerJob::Shutdown),
                            }
                        },
                        async {
                            ticker.next().await;
                            Input::Tick
                        },
                    ),
                )
                .await;

                match input {
                    Input::Socket(event) => self.on_socket_event(event),
                    Input::Job(ServerJob::Push(id)) => self.push(id),
                    Input::Job(ServerJob::Removed(id)) => self.removed(id),
                    Input::Tick => self.tick(),
                    Input::Job(ServerJob::Shutdown) => {
                        info!("Server shutting down");
                        break;
                    }
                    Input::SocketClosed => {
                        warn!("Server socket closed");
                        break;
                    }
                }
            }
        });
        self.close_all();
    }

    fn tick_interval(&self) -> Duration {
        (self.config.connection.heartbeat_interval / 2).max(Duration::from_millis(10))
    }

    fn update_count(&self) {
        let active = self
            .connections
            .values()
            .filter(|connection| connection.state().is_active())
            .count();
        self.connection_count.store(active, Ordering::SeqCst);
    }

    // Socket events

    fn on_socket_event(&mut self, event: ServerSocketEvent) {
        match event {
            ServerSocketEvent::Connected(peer) => {
                debug!("Peer {} attached, awaiting handshake", peer);
                self.connections
                    .insert(peer, Connection::new(peer, &self.config.connection));
            }
            ServerSocketEvent::Packet(peer, payload) => self.on_packet(peer, &payload),
            ServerSocketEvent::Disconnected(peer) => {
                if self.connections.contains_key(&peer) {
                    info!("Peer {} disconnected", peer);
                    self.drop_connection(peer, false);
                }
            }
        }
    }

    fn on_packet(&mut self, peer: PeerKey, payload: &[u8]) {
        let Some(connection) = self.connections.get_mut(&peer) else {
            trace!("Packet from unknown peer {}", peer);
            return;
        };
        connection.mark_heard();
        let state = connection.state();

        let message = match Message::from_bytes(payload) {
            Ok(message) => message,
            Err(err) => {
                warn!("{} from {}", ProtocolError::from(err), peer);
                self.drop_connection(peer, true);
                return;
            }
        };
        trace!("{} -> {:?}", peer, message.kind());

        match message {
            Message::Hello {
                version,
                role,
                features,
            } if !state.is_active() => self.on_hello(peer, version, role, features),
            Message::Heartbeat => {}
            Message::Disconnect => {
                info!("Peer {} closed its connection", peer);
                self.drop_connection(peer, false);
            }
            Message::Collect { request_id, uris } if state.is_active() => {
                self.on_collect(peer, request_id, uris)
            }
            Message::List {
                request_id,
                pattern,
            } if state.is_active() => self.on_list(peer, request_id, pattern),
            Message::SetRequest {
                request_id,
                id,
                value,
            } if state.is_active() => self.on_set(peer, request_id, id, value),
            other => {
                let err = ProtocolError::Unexpected {
                    kind: other.kind(),
                    state: state.name(),
                };
                warn!("Closing {}: {}", peer, err);
                self.drop_connection(peer, true);
            }
        }
    }

    fn on_hello(
        &mut self,
        peer: PeerKey,
        version: u16,
        role: Role,
        features: Features,
    ) {
        let refusal = if version != PROTOCOL_VERSION {
            Some(ProtocolError::VersionMismatch {
                local: PROTOCOL_VERSION,
                remote: version,
            })
        } else if role != Role::Client {
            Some(ProtocolError::RoleMismatch {
                expected: Role::Client,
                remote: role,
            })
        } else {
            None
        };
        if let Some(err) = refusal {
            warn!("Rejecting {}: {}", peer, err);
            self.send(
                peer,
                &Message::Reject {
                    reason: err.to_string(),
                },
            );
            self.drop_connection(peer, false);
            return;
        }

        let negotiated = self.config.features.negotiate(&features);
        let Some(connection) = self.connections.get_mut(&peer) else {
            return;
        };
        if let Err(err) = connection.activate(negotiated, &self.config.connection) {
            warn!("Closing {}: {}", peer, err);
            self.drop_connection(peer, true);
            return;
        }
        info!("Peer {} connected ({:?})", peer, negotiated);
        self.update_count();
        self.send(
            peer,
            &Message::Welcome {
                version: PROTOCOL_VERSION,
                features: negotiated,
            },
        );
    }

    fn on_collect(&mut self, peer: PeerKey, request_id: RequestId, uris: Vec<String>) {
        let Some(connection) = self.connections.get_mut(&peer) else {
            return;
        };
        let features = connection.features();
        let entries = uris
            .iter()
            .map(|uri| match self.context.store().record(uri.as_str()) {
                Ok(record) if features.permits(&record.value) => {
                    connection.subscribe(record.id);
                    CollectEntry::Found(record)
                }
                _ => CollectEntry::NotFound,
            })
            .collect();
        self.send(
            peer,
            &Message::CollectResponse {
                request_id,
                entries,
            },
        );
    }

    fn on_list(&mut self, peer: PeerKey, request_id: RequestId, pattern: UriPattern) {
        let Some(connection) = self.connections.get_mut(&peer) else {
            return;
        };
        let features = connection.features();
        let records: Vec<_> = self
            .context
            .store()
            .records(|descriptor| pattern.matches(&descriptor.uri))
            .into_iter()
            .filter(|record| features.permits(&record.value))
            .collect();
        for record in &records {
            connection.subscribe(record.id);
        }
        debug!(
            "Listed {} item(s) matching '{}' for {}",
            records.len(),
            pattern,
            peer
        );
        self.send(
            peer,
            &Message::ListResponse {
                request_id,
                records,
            },
        );
    }

    fn on_set(&mut self, peer: PeerKey, request_id: RequestId, id: ItemId, value: Value) {
        let Some(connection) = self.connections.get_mut(&peer) else {
            return;
        };
        // items hidden from this peer are treated as missing
        let committed = if connection.features().permits(&value) {
            self.context.set(id, value)
        } else {
            Err(StoreError::not_found(ItemKey::Id(id)))
        };
        if committed.is_ok() {
            connection.subscribe(id);
        }
        let newly_dirty = committed.as_ref().is_ok_and(Change::newly_dirty);
        let result = committed.map(|_| ());
        if let Err(err) = &result {
            debug!("Set request from {} for {} failed: {}", peer, id, err);
        }

        self.send(peer, &Message::SetResponse { request_id, result });
        if newly_dirty {
            self.push(id);
        }
    }

    // Jobs

    fn push(&mut self, id: ItemId) {
        let Some((revision, value)) = self.context.store().take_dirty(id) else {
            trace!("Nothing to push for {}", id);
            return;
        };
        let mut peers: Vec<PeerKey> = self
            .connections
            .values()
            .filter(|connection| {
                connection.state().is_active()
                    && connection.is_subscribed(id)
                    && connection.features().permits(&value)
            })
            .map(|connection| connection.peer)
            .collect();
        if peers.is_empty() {
            return;
        }

        // shuffle order of connections in order to avoid priority among peers
        fastrand::shuffle(&mut peers);

        let message = Message::Update {
            id,
            revision,
            value,
        };
        for peer in peers {
            self.send(peer, &message);
        }
    }

    fn removed(&mut self, id: ItemId) {
        let peers: Vec<PeerKey> = self
            .connections
            .values_mut()
            .filter_map(|connection| connection.unsubscribe(id).then_some(connection.peer))
            .collect();
        for peer in peers {
            self.send(peer, &Message::Removed { id });
        }
    }

    fn tick(&mut self) {
        let timed_out: Vec<PeerKey> = self
            .connections
            .values()
            .filter(|connection| connection.timed_out())
            .map(|connection| connection.peer)
            .collect();
        for peer in timed_out {
            warn!("Peer {} timed out", peer);
            self.drop_connection(peer, true);
        }

        let idle: Vec<PeerKey> = self
            .connections
            .values()
            .filter(|connection| connection.should_send_heartbeat())
            .map(|connection| connection.peer)
            .collect();
        for peer in idle {
            self.send(peer, &Message::Heartbeat);
        }
    }

    // Sending

    fn send(&mut self, peer: PeerKey, message: &Message) {
        let Some(connection) = self.connections.get_mut(&peer) else {
            warn!("Dropping {:?} for closed peer {}", message.kind(), peer);
            return;
        };
        trace!("{} <- {:?}", peer, message.kind());
        match self.sender.send(peer, &message.to_bytes()) {
            Ok(()) => connection.mark_sent(),
            Err(err) => {
                warn!("Send to {} failed: {}", peer, err);
                self.drop_connection(peer, false);
            }
        }
    }

    /// Closes the connection and releases the transport link.
    /// `notify` sends a final `Disconnect` first.
    fn drop_connection(&mut self, peer: PeerKey, notify: bool) {
        if notify {
            if let Some(connection) = self.connections.get(&peer) {
                if connection.state().is_active() {
                    let _ = self.sender.send(peer, &Message::Disconnect.to_bytes());
                }
            }
        }
        if let Some(mut connection) = self.connections.remove(&peer) {
            connection.close();
            self.sender.disconnect(peer);
            self.update_count();
        }
    }

    fn close_all(&mut self) {
        let peers: Vec<PeerKey> = self.connections.keys().copied().collect();
        for peer in peers {
            self.drop_connection(peer, true);
        }
    }
}
