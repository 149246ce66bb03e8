use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by a Server or Client
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// How long a client waits for the server to accept its handshake
    pub handshake_timeout: Duration,
    /// How long a collect, list or set request may wait for its response
    pub request_timeout: Duration,
    /// How often an idle connection sends a heartbeat
    pub heartbeat_interval: Duration,
    /// A connection not heard from for this long is closed
    pub disconnection_timeout_duration: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(2),
            disconnection_timeout_duration: Duration::from_secs(30),
        }
    }
}
