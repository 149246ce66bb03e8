use std::{
    collections::HashMap,
    io,
    net::{Shutdown, SocketAddr},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use log::{debug, info, warn};
use smol::{
    channel::{self, Receiver, Sender},
    future,
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use super::{
    ClientPacketSender, ClientSocket, ClientSocketEvent, ClientSocketParts, ServerPacketSender,
    ServerSocket, ServerSocketEvent, ServerSocketParts, TransportError, TransportFactory,
};
use crate::types::PeerKey;

pub const TCP_TRANSPORT: &str = "tcp";

/// Frames larger than this are treated as a broken stream
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Builds TCP sockets. Each message is sent as a little-endian `u32` length
/// followed by that many bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpTransport;

impl TransportFactory for TcpTransport {
    fn server_socket(&self, address: &str) -> Result<Box<dyn ServerSocket>, TransportError> {
        Ok(Box::new(TcpServerSocket::bind(address)?))
    }

    fn client_socket(&self, address: &str) -> Result<Box<dyn ClientSocket>, TransportError> {
        Ok(Box::new(TcpClientSocket::new(address)))
    }
}

async fn read_frame(stream: &mut TcpStream) -> io::Result<Box<[u8]>> {
    let mut header = [0; 4];
    stream.read_exact(&mut header).await?;
    let length = u32::from_le_bytes(header) as usize;
    if length > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", length),
        ));
    }
    let mut payload = vec![0; length];
    stream.read_exact(&mut payload).await?;
    Ok(payload.into_boxed_slice())
}

async fn write_frames(mut stream: TcpStream, outgoing: Receiver<Box<[u8]>>) {
    while let Ok(payload) = outgoing.recv().await {
        let Ok(length) = u32::try_from(payload.len()) else {
            warn!("Dropping oversized outgoing frame of {} bytes", payload.len());
            continue;
        };
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&payload);
        if stream.write_all(&frame).await.is_err() || stream.flush().await.is_err() {
            break;
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
}

fn queue_frame(outgoing: &Sender<Box<[u8]>>, payload: &[u8]) -> Result<(), TransportError> {
    outgoing
        .try_send(payload.into())
        .map_err(|_| TransportError::ConnectionClosed)
}

type PeerMap = Arc<Mutex<HashMap<PeerKey, Sender<Box<[u8]>>>>>;

fn lock_peers(peers: &PeerMap) -> MutexGuard<'_, HashMap<PeerKey, Sender<Box<[u8]>>>> {
    peers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A bound TCP listener, ready to [`listen`](ServerSocket::listen)
pub struct TcpServerSocket {
    listener: TcpListener,
}

impl TcpServerSocket {
    /// Binds immediately, so port `0` can be resolved with [`Self::local_addr`]
    pub fn bind(address: &str) -> Result<Self, TransportError> {
        let listener = smol::block_on(TcpListener::bind(address)).map_err(|err| {
            if err.kind() == io::ErrorKind::AddrInUse {
                TransportError::AddressInUse {
                    address: address.to_string(),
                }
            } else {
                TransportError::InvalidAddress {
                    address: address.to_string(),
                    reason: err.to_string(),
                }
            }
        })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(|err| TransportError::InvalidAddress {
                address: String::new(),
                reason: err.to_string(),
            })
    }
}

impl ServerSocket for TcpServerSocket {
    fn listen(self: Box<Self>) -> Result<ServerSocketParts, TransportError> {
        let listener = self.listener;
        if let Ok(address) = listener.local_addr() {
            info!("TCP server listening on {}", address);
        }
        let (event_sender, event_receiver) = channel::unbounded();
        let (shutdown_sender, shutdown_receiver) = channel::bounded::<()>(1);
        let peers = PeerMap::default();

        let accept_peers = peers.clone();
        thread::Builder::new()
            .name("tweak-tcp-accept".to_string())
            .spawn(move || {
                smol::block_on(accept_loop(
                    listener,
                    accept_peers,
                    event_sender,
                    shutdown_receiver,
                ))
            })
            .map_err(|err| TransportError::InvalidAddress {
                address: String::new(),
                reason: err.to_string(),
            })?;

        let packet_sender = TcpServerSender {
            peers,
            _shutdown: shutdown_sender,
        };
        Ok((Box::new(packet_sender), event_receiver))
    }
}

async fn accept_loop(
    listener: TcpListener,
    peers: PeerMap,
    events: Sender<ServerSocketEvent>,
    shutdown: Receiver<()>,
) {
    let mut next_peer = 0;
    loop {
        let accepted = future::or(async { Some(listener.accept().await) }, async {
            let _ = shutdown.recv().await;
            None
        })
        .await;

        let (stream, address) = match accepted {
            Some(Ok(accepted)) => accepted,
            Some(Err(err)) => {
                warn!("TCP accept failed: {}", err);
                continue;
            }
            None => break,
        };
        let _ = stream.set_nodelay(true);

        next_peer += 1;
        let peer = PeerKey::new(next_peer);
        debug!("TCP peer {} connected from {}", peer, address);

        let (outgoing_sender, outgoing_receiver) = channel::unbounded();
        lock_peers(&peers).insert(peer, outgoing_sender);
        if events.send(ServerSocketEvent::Connected(peer)).await.is_err() {
            break;
        }

        smol::spawn(write_frames(stream.clone(), outgoing_receiver)).detach();
        smol::spawn(read_peer(stream, peer, peers.clone(), events.clone())).detach();
    }
    debug!("TCP accept loop stopped");
}

async fn read_peer(
    mut stream: TcpStream,
    peer: PeerKey,
    peers: PeerMap,
    events: Sender<ServerSocketEvent>,
) {
    loop {
        match read_frame(&mut stream).await {
            Ok(payload) => {
                if events
                    .send(ServerSocketEvent::Packet(peer, payload))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                debug!("TCP peer {} closed: {}", peer, err);
                break;
            }
        }
    }
    lock_peers(&peers).remove(&peer);
    let _ = stream.shutdown(Shutdown::Both);
    let _ = events.send(ServerSocketEvent::Disconnected(peer)).await;
}

struct TcpServerSender {
    peers: PeerMap,
    // dropping this stops the accept loop
    _shutdown: Sender<()>,
}

impl ServerPacketSender for TcpServerSender {
    fn send(&self, peer: PeerKey, payload: &[u8]) -> Result<(), TransportError> {
        let peers = lock_peers(&self.peers);
        let outgoing = peers.get(&peer).ok_or(TransportError::ConnectionClosed)?;
        queue_frame(outgoing, payload)
    }

    fn disconnect(&self, peer: PeerKey) {
        // the writer shuts the stream down once its queue is closed
        lock_peers(&self.peers).remove(&peer);
    }
}

impl Drop for TcpServerSender {
    fn drop(&mut self) {
        lock_peers(&self.peers).clear();
    }
}

/// A TCP client endpoint, connects on [`connect`](ClientSocket::connect)
pub struct TcpClientSocket {
    address: String,
}

impl TcpClientSocket {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl ClientSocket for TcpClientSocket {
    fn connect(self: Box<Self>) -> Result<ClientSocketParts, TransportError> {
        let stream = smol::block_on(TcpStream::connect(self.address.as_str())).map_err(|err| {
            TransportError::ConnectFailed {
                address: self.address.clone(),
                reason: err.to_string(),
            }
        })?;
        let _ = stream.set_nodelay(true);
        debug!("TCP client connected to {}", self.address);

        let (event_sender, event_receiver) = channel::unbounded();
        let (outgoing_sender, outgoing_receiver) = channel::unbounded();
        smol::spawn(write_frames(stream.clone(), outgoing_receiver)).detach();
        smol::spawn(read_server(stream, event_sender)).detach();

        let packet_sender = TcpClientSender {
            outgoing: Mutex::new(Some(outgoing_sender)),
        };
        Ok((Box::new(packet_sender), event_receiver))
    }
}

async fn read_server(mut stream: TcpStream, events: Sender<ClientSocketEvent>) {
    while let Ok(payload) = read_frame(&mut stream).await {
        if events.send(ClientSocketEvent::Packet(payload)).await.is_err() {
            break;
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
    let _ = events.send(ClientSocketEvent::Disconnected).await;
}

struct TcpClientSender {
    outgoing: Mutex<Option<Sender<Box<[u8]>>>>,
}

impl ClientPacketSender for TcpClientSender {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let outgoing = self.outgoing.lock().unwrap_or_else(PoisonError::into_inner);
        let outgoing = outgoing.as_ref().ok_or(TransportError::ConnectionClosed)?;
        queue_frame(outgoing, payload)
    }

    fn disconnect(&self) {
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
