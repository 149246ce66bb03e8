use std::default::Default;

use tweak_shared::{ConnectionConfig, Features};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used to configure the connection with the Server
    pub connection: ConnectionConfig,
    /// Capabilities offered to the server during the handshake
    pub features: Features,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            features: Features::default(),
        }
    }
}
