use smol::channel::Receiver;

use super::TransportError;
use crate::types::PeerKey;

/// Something that happened on a listening socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSocketEvent {
    Connected(PeerKey),
    Packet(PeerKey, Box<[u8]>),
    Disconnected(PeerKey),
}

/// Something that happened on a connected client socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSocketEvent {
    Packet(Box<[u8]>),
    Disconnected,
}

/// Used to send whole messages to connected peers
pub trait ServerPacketSender: Send + Sync {
    fn send(&self, peer: PeerKey, payload: &[u8]) -> Result<(), TransportError>;
    /// Drops the link to `peer`. The peer observes a disconnect.
    fn disconnect(&self, peer: PeerKey);
}

/// Used to send whole messages to the server
pub trait ClientPacketSender: Send + Sync {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;
    fn disconnect(&self);
}

pub type ServerSocketParts = (Box<dyn ServerPacketSender>, Receiver<ServerSocketEvent>);
pub type ClientSocketParts = (Box<dyn ClientPacketSender>, Receiver<ClientSocketEvent>);

/// A server endpoint that has been configured but not started
pub trait ServerSocket: Send {
    fn listen(self: Box<Self>) -> Result<ServerSocketParts, TransportError>;
}

/// A client endpoint that has been configured but not connected
pub trait ClientSocket: Send {
    fn connect(self: Box<Self>) -> Result<ClientSocketParts, TransportError>;
}

/// Builds sockets for one named transport
pub trait TransportFactory: Send + Sync {
    fn server_socket(&self, address: &str) -> Result<Box<dyn ServerSocket>, TransportError>;
    fn client_socket(&self, address: &str) -> Result<Box<dyn ClientSocket>, TransportError>;
}
