use tweak_client::{Client, ClientConfig, TcpClientSocket};
use tweak_server::{
    shared::{ConnectionState, EndpointConfig, ItemOptions, Role, TransportRegistry, Value},
    Server, ServerConfig, TcpServerSocket,
};
use tweak_test::{assert_eventually, assert_mirror_converges, init_logging};

/// The full scenario over a real loopback socket
#[test]
fn tcp_end_to_end() {
    init_logging();
    let socket = TcpServerSocket::bind("127.0.0.1:0").unwrap();
    let address = socket.local_addr().unwrap();

    let server = Server::new(ServerConfig::default());
    let id = server.add("/a/testBool1", false, ItemOptions::new()).unwrap();
    server.listen(Box::new(socket)).unwrap();

    let client = Client::connect(
        ClientConfig::default(),
        Box::new(TcpClientSocket::new(address.to_string())),
    )
    .unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Active);
    assert_eq!(client.collect(&["/a/testBool1"]).unwrap(), vec![Ok(id)]);

    server.set(id, true).unwrap();
    assert_mirror_converges!(client, id, true);

    client.set(id, false).unwrap();
    assert_eq!(server.get(id), Ok(Value::Bool(false)));
    assert_mirror_converges!(client, id, false);

    client.disconnect();
    assert_eventually!(
        server.connection_count() == 0,
        "server kept a closed tcp connection"
    );
}

/// Endpoints resolved from the connection triple through the registry
#[test]
fn tcp_through_registry() {
    init_logging();
    let registry = TransportRegistry::new();
    assert!(registry.contains("tcp"));

    // bind an ephemeral port first so the uri names a free one
    let probe = TcpServerSocket::bind("127.0.0.1:0").unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let uri = format!("tcp://127.0.0.1:{}/", port);
    let server_endpoint = EndpointConfig::from_params("nng", "role=server", &uri).unwrap();
    assert_eq!(server_endpoint.role, Role::Server);
    assert_eq!(server_endpoint.transport_name, "tcp");

    let server = Server::new(ServerConfig::default());
    server.add("/n/value", 1_i64, ItemOptions::new()).unwrap();
    server.listen_endpoint(&registry, &server_endpoint).unwrap();

    let client_endpoint = EndpointConfig::from_params("nng", "role=client", &uri).unwrap();
    let client =
        Client::connect_endpoint(ClientConfig::default(), &registry, &client_endpoint).unwrap();
    let listed = client.list("/n/*", |_| true).unwrap();
    assert_eq!(listed.uris(), vec!["/n/value"]);
}
