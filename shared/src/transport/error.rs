use std::time::Duration;

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors that can occur while opening, using or losing a transport link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No factory is registered under this name
    #[error("Unknown transport '{name}'")]
    UnknownTransport {
        name: String,
    },

    /// Endpoint parameters could not be understood
    #[error("Invalid endpoint parameters '{params}': {reason}")]
    InvalidParams {
        params: String,
        reason: String,
    },

    /// Address is not usable by the selected transport
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        address: String,
        reason: String,
    },

    /// Something is already listening on this address
    #[error("Address '{address}' is already in use")]
    AddressInUse {
        address: String,
    },

    /// Could not reach the remote endpoint
    #[error("Failed to connect to '{address}': {reason}")]
    ConnectFailed {
        address: String,
        reason: String,
    },

    /// The link went away while a request was outstanding, or before a send
    #[error("Connection closed")]
    ConnectionClosed,

    /// No response arrived in time
    #[error("Timed out after {waited:?} waiting for {operation}")]
    TimedOut {
        operation: &'static str,
        waited: Duration,
    },

    /// The handshake or a later exchange broke protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
