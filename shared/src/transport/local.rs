use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info};
use smol::channel::{self, Sender};

use super::{
    ClientPacketSender, ClientSocket, ClientSocketEvent, ClientSocketParts, ServerPacketSender,
    ServerSocket, ServerSocketEvent, ServerSocketParts, TransportError, TransportFactory,
    TransportRegistry,
};
use crate::types::PeerKey;

pub const LOCAL_TRANSPORT: &str = "local";

struct Link {
    address: String,
    to_client: Sender<ClientSocketEvent>,
    to_server: Sender<ServerSocketEvent>,
}

impl Link {
    fn notify_both(&self, peer: PeerKey) {
        let _ = self.to_client.try_send(ClientSocketEvent::Disconnected);
        let _ = self.to_server.try_send(ServerSocketEvent::Disconnected(peer));
    }
}

#[derive(Default)]
struct HubInner {
    listeners: HashMap<String, Sender<ServerSocketEvent>>,
    links: HashMap<PeerKey, Link>,
    next_peer: u64,
}

/// An in-process transport. Servers listen on a named address inside the
/// hub and clients of the same hub connect to it; packets travel over
/// channels. [`LocalHub::sever`] drops links to simulate a network failure.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn server_socket(&self, address: &str) -> LocalServerSocket {
        LocalServerSocket {
            hub: self.clone(),
            address: address.to_string(),
        }
    }

    pub fn client_socket(&self, address: &str) -> LocalClientSocket {
        LocalClientSocket {
            hub: self.clone(),
            address: address.to_string(),
        }
    }

    /// Makes this hub reachable as the `local` transport of `registry`
    pub fn register(&self, registry: &mut TransportRegistry) {
        registry.register(LOCAL_TRANSPORT, self.clone());
    }

    /// Breaks every link to `address`, both ends see a disconnect.
    /// Returns how many links were cut.
    pub fn sever(&self, address: &str) -> usize {
        let mut inner = self.lock();
        let peers: Vec<PeerKey> = inner
            .links
            .iter()
            .filter(|(_, link)| link.address == address)
            .map(|(peer, _)| *peer)
            .collect();
        for peer in &peers {
            if let Some(link) = inner.links.remove(peer) {
                link.notify_both(*peer);
            }
        }
        info!("Severed {} local link(s) to '{}'", peers.len(), address);
        peers.len()
    }

    /// Number of live client links
    pub fn link_count(&self) -> usize {
        self.lock().links.len()
    }
}

impl TransportFactory for LocalHub {
    fn server_socket(&self, address: &str) -> Result<Box<dyn ServerSocket>, TransportError> {
        Ok(Box::new(LocalHub::server_socket(self, address)))
    }

    fn client_socket(&self, address: &str) -> Result<Box<dyn ClientSocket>, TransportError> {
        Ok(Box::new(LocalHub::client_socket(self, address)))
    }
}

pub struct LocalServerSocket {
    hub: LocalHub,
    address: String,
}

impl ServerSocket for LocalServerSocket {
    fn listen(self: Box<Self>) -> Result<ServerSocketParts, TransportError> {
        let mut inner = self.hub.lock();
        if let Some(existing) = inner.listeners.get(&self.address) {
            if !existing.is_closed() {
                return Err(TransportError::AddressInUse {
                    address: self.address.clone(),
                });
            }
        }
        let (sender, receiver) = channel::unbounded();
        inner.listeners.insert(self.address.clone(), sender);
        drop(inner);
        debug!("Local server listening on '{}'", self.address);

        let packet_sender = LocalServerSender {
            hub: self.hub.clone(),
            address: self.address.clone(),
        };
        Ok((Box::new(packet_sender), receiver))
    }
}

struct LocalServerSender {
    hub: LocalHub,
    address: String,
}

impl ServerPacketSender for LocalServerSender {
    fn send(&self, peer: PeerKey, payload: &[u8]) -> Result<(), TransportError> {
        let inner = self.hub.lock();
        let link = inner
            .links
            .get(&peer)
            .ok_or(TransportError::ConnectionClosed)?;
        link.to_client
            .try_send(ClientSocketEvent::Packet(payload.into()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn disconnect(&self, peer: PeerKey) {
        if let Some(link) = self.hub.lock().links.remove(&peer) {
            let _ = link.to_client.try_send(ClientSocketEvent::Disconnected);
        }
    }
}

impl Drop for LocalServerSender {
    fn drop(&mut self) {
        let mut inner = self.hub.lock();
        inner.listeners.remove(&self.address);
        let address = self.address.clone();
        inner.links.retain(|_, link| {
            if link.address == address {
                let _ = link.to_client.try_send(ClientSocketEvent::Disconnected);
                false
            } else {
                true
            }
        });
    }
}

pub struct LocalClientSocket {
    hub: LocalHub,
    address: String,
}

impl ClientSocket for LocalClientSocket {
    fn connect(self: Box<Self>) -> Result<ClientSocketParts, TransportError> {
        let mut inner = self.hub.lock();
        let to_server = inner
            .listeners
            .get(&self.address)
            .filter(|listener| !listener.is_closed())
            .cloned()
            .ok_or_else(|| TransportError::ConnectFailed {
                address: self.address.clone(),
                reason: "nothing is listening".to_string(),
            })?;

        inner.next_peer += 1;
        let peer = PeerKey::new(inner.next_peer);
        let (to_client, receiver) = channel::unbounded();
        // announced under the lock, so it precedes any packet from this peer
        to_server
            .try_send(ServerSocketEvent::Connected(peer))
            .map_err(|_| TransportError::ConnectFailed {
                address: self.address.clone(),
                reason: "listener closed".to_string(),
            })?;
        inner.links.insert(
            peer,
            Link {
                address: self.address.clone(),
                to_client,
                to_server,
            },
        );
        drop(inner);
        debug!("Local client {} connected to '{}'", peer, self.address);

        let packet_sender = LocalClientSender {
            hub: self.hub.clone(),
            peer,
        };
        Ok((Box::new(packet_sender), receiver))
    }
}

struct LocalClientSender {
    hub: LocalHub,
    peer: PeerKey,
}

impl ClientPacketSender for LocalClientSender {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let inner = self.hub.lock();
        let link = inner
            .links
            .get(&self.peer)
            .ok_or(TransportError::ConnectionClosed)?;
        link.to_server
            .try_send(ServerSocketEvent::Packet(self.peer, payload.into()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn disconnect(&self) {
        if let Some(link) = self.hub.lock().links.remove(&self.peer) {
            link.notify_both(self.peer);
        }
    }
}

impl Drop for LocalClientSender {
    fn drop(&mut self) {
        self.disconnect();
    }
}
