use std::time::Duration;

use tweak_client::{Client, ClientConfig, TweakClientError};
use tweak_server::{
    shared::{
        ConnectionConfig, ConnectionState, EndpointConfig, ItemOptions, LocalHub, Role,
        TransportError, TransportRegistry,
    },
    Server, ServerConfig, TweakServerError,
};
use tweak_shared::{
    ClientSocket, ClientSocketEvent, Features, Message, ServerSocket, ServerSocketEvent,
    PROTOCOL_VERSION,
};
use tweak_test::{assert_eventually, init_logging, poll_until, TestPair};

/// Severing the link closes the client and fails later requests
#[test]
fn severed_link_closes_connection() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/value", 1_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/value"]).unwrap();

    assert_eq!(pair.hub.sever(&pair.address), 1);
    assert_eventually!(
        client.connection_state() == ConnectionState::Closed,
        "client never noticed the severed link"
    );
    assert_eventually!(
        pair.server.connection_count() == 0,
        "server never dropped the severed peer"
    );

    assert_eq!(
        client.set(id, 2_i64),
        Err(TweakClientError::Transport(TransportError::ConnectionClosed))
    );
    assert!(matches!(
        client.collect(&["/a/value"]),
        Err(TweakClientError::Transport(TransportError::ConnectionClosed))
    ));
    // the mirror keeps its last known value
    assert_eq!(client.get(id).unwrap().as_int(), Some(1));

    // a fresh client resynchronizes
    pair.server.set(id, 3_i64).unwrap();
    let fresh = pair.client();
    fresh.collect(&["/a/value"]).unwrap();
    assert_eq!(fresh.get(id).unwrap().as_int(), Some(3));
}

/// A request blocked on the server's answer fails once the link drops
#[test]
fn in_flight_request_fails_on_disconnect() {
    init_logging();
    let hub = LocalHub::new();
    // a raw listener that accepts the handshake and then never answers
    let (sender, events) = Box::new(hub.server_socket("silent")).listen().unwrap();
    let handle = std::thread::spawn(move || {
        let mut peer = None;
        while let Ok(event) = events.recv_blocking() {
            match event {
                ServerSocketEvent::Connected(key) => peer = Some(key),
                ServerSocketEvent::Packet(key, payload) => {
                    if let Ok(Message::Hello { .. }) = Message::from_bytes(&payload) {
                        let welcome = Message::Welcome {
                            version: PROTOCOL_VERSION,
                            features: Features::default(),
                        };
                        sender.send(key, &welcome.to_bytes()).unwrap();
                    }
                }
                ServerSocketEvent::Disconnected(_) => break,
            }
        }
        drop(sender);
        peer
    });

    let client = Client::connect(
        ClientConfig::default(),
        Box::new(hub.client_socket("silent")),
    )
    .unwrap();

    let severing_hub = hub.clone();
    let severer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        severing_hub.sever("silent")
    });

    assert_eq!(
        client.collect(&["/anything"]),
        Err(TweakClientError::Transport(TransportError::ConnectionClosed))
    );
    assert_eq!(severer.join().unwrap(), 1);
    assert!(handle.join().unwrap().is_some());
}

/// Requests give up after the configured timeout
#[test]
fn unanswered_request_times_out() {
    init_logging();
    let hub = LocalHub::new();
    let (sender, events) = Box::new(hub.server_socket("slow")).listen().unwrap();
    std::thread::spawn(move || {
        while let Ok(event) = events.recv_blocking() {
            match event {
                ServerSocketEvent::Packet(key, payload) => {
                    if let Ok(Message::Hello { .. }) = Message::from_bytes(&payload) {
                        let welcome = Message::Welcome {
                            version: PROTOCOL_VERSION,
                            features: Features::default(),
                        };
                        let _ = sender.send(key, &welcome.to_bytes());
                    }
                }
                ServerSocketEvent::Disconnected(_) => break,
                ServerSocketEvent::Connected(_) => {}
            }
        }
    });

    let config = ClientConfig {
        connection: ConnectionConfig {
            request_timeout: Duration::from_millis(100),
            ..ConnectionConfig::default()
        },
        ..ClientConfig::default()
    };
    let client = Client::connect(config, Box::new(hub.client_socket("slow"))).unwrap();
    assert!(matches!(
        client.collect(&["/x"]),
        Err(TweakClientError::Transport(TransportError::TimedOut {
            operation: "collect",
            ..
        }))
    ));
    // a timeout is not a disconnect
    assert_eq!(client.connection_state(), ConnectionState::Active);
}

/// The server rejects peers that speak another protocol version
#[test]
fn version_mismatch_rejected() {
    let pair = TestPair::new();
    let (sender, events) = Box::new(pair.hub.client_socket(&pair.address))
        .connect()
        .unwrap();
    let hello = Message::Hello {
        version: PROTOCOL_VERSION + 1,
        role: Role::Client,
        features: Features::default(),
    };
    sender.send(&hello.to_bytes()).unwrap();

    let Ok(ClientSocketEvent::Packet(payload)) = events.recv_blocking() else {
        panic!("expected a reply to hello");
    };
    assert!(matches!(
        Message::from_bytes(&payload),
        Ok(Message::Reject { .. })
    ));
    assert_eq!(events.recv_blocking(), Ok(ClientSocketEvent::Disconnected));
    assert_eq!(pair.server.connection_count(), 0);
}

/// Connecting to an address nobody listens on fails up front
#[test]
fn connect_without_server() {
    init_logging();
    let hub = LocalHub::new();
    assert!(matches!(
        Client::connect(ClientConfig::default(), Box::new(hub.client_socket("void"))),
        Err(TweakClientError::Transport(TransportError::ConnectFailed { .. }))
    ));
}

/// A handshake nobody answers times out and leaves nothing behind
#[test]
fn handshake_times_out() {
    init_logging();
    let hub = LocalHub::new();
    let (_sender, _events) = Box::new(hub.server_socket("mute")).listen().unwrap();
    let config = ClientConfig {
        connection: ConnectionConfig {
            handshake_timeout: Duration::from_millis(50),
            ..ConnectionConfig::default()
        },
        ..ClientConfig::default()
    };
    assert!(matches!(
        Client::connect(config, Box::new(hub.client_socket("mute"))),
        Err(TweakClientError::Transport(TransportError::TimedOut {
            operation: "handshake",
            ..
        }))
    ));
    assert!(poll_until(|| hub.link_count() == 0));
}

/// The local hub resolves through the registry like any other transport
#[test]
fn local_hub_through_registry() {
    init_logging();
    let hub = LocalHub::new();
    let mut registry = TransportRegistry::empty();
    hub.register(&mut registry);

    let server_endpoint = EndpointConfig::from_params("local", "role=server", "hub-a").unwrap();
    let server = Server::new(ServerConfig::default());
    server.add("/r/x", true, ItemOptions::new()).unwrap();
    server.listen_endpoint(&registry, &server_endpoint).unwrap();
    assert_eq!(
        server.listen_endpoint(&registry, &server_endpoint),
        Err(TweakServerError::AlreadyListening)
    );

    let client_endpoint = EndpointConfig::new("local", Role::Client, "hub-a");
    let client =
        Client::connect_endpoint(ClientConfig::default(), &registry, &client_endpoint).unwrap();
    assert_eq!(client.collect(&["/r/x"]).unwrap().len(), 1);

    // wrong role for the operation
    assert!(matches!(
        registry.client_socket(&server_endpoint),
        Err(TransportError::InvalidParams { .. })
    ));
    assert!(matches!(
        registry.server_socket(&EndpointConfig::new("carrier-pigeon", Role::Server, "x")),
        Err(TransportError::UnknownTransport { .. })
    ));
}
