use std::sync::atomic::{AtomicU64, Ordering};

use tweak_client::{Client, ClientConfig};
use tweak_server::{Server, ServerConfig};
use tweak_shared::{EventObserver, Features, LocalHub};

use super::{init_logging, poll_until};

static NEXT_ADDRESS: AtomicU64 = AtomicU64::new(1);

/// A listening server on its own in-process hub
pub struct TestPair {
    pub hub: LocalHub,
    pub address: String,
    pub server: Server,
}

impl TestPair {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        init_logging();
        let hub = LocalHub::new();
        let address = format!(
            "tweak-test-{}",
            NEXT_ADDRESS.fetch_add(1, Ordering::Relaxed)
        );
        let server = Server::new(config);
        server
            .listen(Box::new(hub.server_socket(&address)))
            .expect("server listens on a fresh hub address");
        Self {
            hub,
            address,
            server,
        }
    }

    pub fn client(&self) -> Client {
        self.client_with(ClientConfig::default())
    }

    pub fn client_with_features(&self, features: Features) -> Client {
        self.client_with(ClientConfig {
            features,
            ..ClientConfig::default()
        })
    }

    /// Connects a client and waits until the server counts it
    pub fn client_with(&self, config: ClientConfig) -> Client {
        let expected = self.server.connection_count() + 1;
        let client = Client::connect(config, Box::new(self.hub.client_socket(&self.address)))
            .expect("client connects to the test server");
        self.await_counted(expected);
        client
    }

    /// Connects a client whose event observer is set before the link is up
    pub fn client_with_events(&self, observer: impl EventObserver + 'static) -> Client {
        let expected = self.server.connection_count() + 1;
        let client = Client::connect_with_events(
            ClientConfig::default(),
            Box::new(self.hub.client_socket(&self.address)),
            observer,
        )
        .expect("client connects to the test server");
        self.await_counted(expected);
        client
    }

    fn await_counted(&self, expected: usize) {
        assert!(
            poll_until(|| self.server.connection_count() >= expected),
            "server never counted the new client"
        );
    }
}

impl Default for TestPair {
    fn default() -> Self {
        Self::new()
    }
}
