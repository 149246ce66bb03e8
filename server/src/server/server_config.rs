use std::default::Default;

use tweak_shared::{ConnectionConfig, Features};

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Used to configure the connections with Clients
    pub connection: ConnectionConfig,
    /// Capabilities offered to clients during the handshake
    pub features: Features,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            features: Features::default(),
        }
    }
}
