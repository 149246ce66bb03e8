use log::{debug, info, warn};
use smol::{channel::Receiver, future, Timer};

use tweak_shared::{
    ClientPacketSender, ClientSocketEvent, ConnectionState, Features, Message, MessageKind,
    ProtocolError, Role, TransportError, PROTOCOL_VERSION,
};

use crate::ClientConfig;

/// Runs the client side of the handshake on a freshly connected socket and
/// returns the negotiated features. Any failure leaves the link closed.
pub fn handshake(
    sender: &dyn ClientPacketSender,
    events: &Receiver<ClientSocketEvent>,
    config: &ClientConfig,
) -> Result<Features, TransportError> {
    let mut state = ConnectionState::Connecting;
    let result = run(&mut state, sender, events, config);
    match &result {
        Ok(features) => info!("Connected to server ({:?})", features),
        Err(err) => {
            warn!("Handshake failed: {}", err);
            state.close();
            sender.disconnect();
        }
    }
    result
}

fn run(
    state: &mut ConnectionState,
    sender: &dyn ClientPacketSender,
    events: &Receiver<ClientSocketEvent>,
    config: &ClientConfig,
) -> Result<Features, TransportError> {
    let unexpected = |kind, state: ConnectionState| {
        TransportError::Protocol(ProtocolError::Unexpected {
            kind,
            state: state.name(),
        })
    };

    state.transition(ConnectionState::Handshaking).map_err(|_| {
        unexpected(MessageKind::Hello, *state)
    })?;
    let hello = Message::Hello {
        version: PROTOCOL_VERSION,
        role: Role::Client,
        features: config.features,
    };
    sender.send(&hello.to_bytes())?;
    debug!("Sent hello, awaiting welcome");

    let timeout = config.connection.handshake_timeout;
    let event = smol::block_on(future::or(
        async { events.recv().await.ok() },
        async {
            Timer::after(timeout).await;
            None
        },
    ));
    let payload = match event {
        Some(ClientSocketEvent::Packet(payload)) => payload,
        Some(ClientSocketEvent::Disconnected) => return Err(TransportError::ConnectionClosed),
        None if events.is_closed() => return Err(TransportError::ConnectionClosed),
        None => {
            return Err(TransportError::TimedOut {
                operation: "handshake",
                waited: timeout,
            })
        }
    };

    match Message::from_bytes(&payload).map_err(ProtocolError::from)? {
        Message::Welcome { version, features } => {
            if version != PROTOCOL_VERSION {
                return Err(ProtocolError::VersionMismatch {
                    local: PROTOCOL_VERSION,
                    remote: version,
                }
                .into());
            }
            state
                .transition(ConnectionState::Active)
                .map_err(|_| unexpected(MessageKind::Welcome, *state))?;
            Ok(features)
        }
        Message::Reject { reason } => Err(ProtocolError::Rejected { reason }.into()),
        other => Err(unexpected(other.kind(), *state)),
    }
}
