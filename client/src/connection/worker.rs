use std::sync::Arc;

use log::{debug, info, trace, warn};
use smol::{channel::Receiver, future, stream::StreamExt, Timer as AsyncTimer};

use tweak_shared::{
    ClientSocketEvent, CollectEntry, ConnectionConfig, Message, ProtocolError, Timer,
    TweakContext,
};

use super::connection::ServerConnection;

enum Input {
    Socket(ClientSocketEvent),
    SocketClosed,
    Tick,
}

/// Applies what the server sends to the mirror and routes responses to
/// waiting requests, until the link closes
pub fn run(
    connection: Arc<ServerConnection>,
    context: Arc<TweakContext>,
    events: Receiver<ClientSocketEvent>,
    config: ConnectionConfig,
) {
    let tick = (config.heartbeat_interval / 2).max(std::time::Duration::from_millis(10));
    let mut timeout_timer = Timer::new(config.disconnection_timeout_duration);

    smol::block_on(async {
        let mut ticker = AsyncTimer::interval(tick);
        loop {
            let input = future::or(
                async {
                    match events.recv().await {
                        Ok(event) => Input::Socket(event),
                        Err(_) => Input::SocketClosed,
                    }
                },
                async {
                    ticker.next().await;
                    Input::Tick
                },
            )
            .await;

            match input {
                Input::Socket(ClientSocketEvent::Packet(payload)) => {
                    timeout_timer.reset();
                    if !receive(&connection, &context, &payload) {
                        break;
                    }
                }
                Input::Socket(ClientSocketEvent::Disconnected) | Input::SocketClosed => {
                    info!("Server link lost");
                    connection.close(false);
                    break;
                }
                Input::Tick => {
                    if !connection.state().is_active() {
                        break;
                    }
                    if timeout_timer.ringing() {
                        warn!("Server timed out");
                        connection.close(true);
                        break;
                    }
                    if connection.heartbeat_due() {
                        let _ = connection.send(&Message::Heartbeat);
                    }
                }
            }
        }
    });
    debug!("Client IO worker stopped");
}

/// Returns false once the connection is over
fn receive(connection: &ServerConnection, context: &TweakContext, payload: &[u8]) -> bool {
    let message = match Message::from_bytes(payload) {
        Ok(message) => message,
        Err(err) => {
            warn!("{}", ProtocolError::from(err));
            connection.close(true);
            return false;
        }
    };
    trace!("<- {:?}", message.kind());

    match message {
        Message::Update {
            id,
            revision,
            value,
        } => {
            context.apply_update(id, revision, value);
        }
        Message::Removed { id } => {
            context.apply_removed(id);
        }
        // records reach the mirror before the caller sees the response
        Message::CollectResponse { ref entries, .. } => {
            for entry in entries {
                if let CollectEntry::Found(record) = entry {
                    context.apply_record(record.clone());
                }
            }
            connection.pending().resolve(message);
        }
        Message::ListResponse { ref records, .. } => {
            for record in records {
                context.apply_record(record.clone());
            }
            connection.pending().resolve(message);
        }
        Message::SetResponse { .. } => {
            connection.pending().resolve(message);
        }
        Message::Heartbeat => {}
        Message::Disconnect => {
            info!("Server closed the connection");
            connection.close(false);
            return false;
        }
        other => {
            warn!(
                "{}",
                ProtocolError::Unexpected {
                    kind: other.kind(),
                    state: connection.state().name(),
                }
            );
            connection.close(true);
            return false;
        }
    }
    true
}
