use thiserror::Error;

use tweak_serde::SerdeErr;

use crate::types::Role;

use super::MessageKind;

/// Errors that can occur while speaking the sync protocol with a peer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Payload could not be decoded (SECURITY: potentially malicious packet)
    #[error("Malformed message: {0}")]
    Malformed(#[from] SerdeErr),

    /// Peers speak different protocol versions
    #[error("Protocol version mismatch: local {local}, remote {remote}")]
    VersionMismatch {
        local: u16,
        remote: u16,
    },

    /// Peer announced the wrong role, e.g. two servers
    #[error("Peer announced role {remote}, expected {expected}")]
    RoleMismatch {
        expected: Role,
        remote: Role,
    },

    /// Message not valid in the current connection state
    #[error("Unexpected {kind:?} message while {state}")]
    Unexpected {
        kind: MessageKind,
        state: &'static str,
    },

    /// A response did not fit the request it answers
    #[error("Invalid response: {reason}")]
    InvalidResponse {
        reason: String,
    },

    /// The server refused the handshake
    #[error("Handshake rejected: {reason}")]
    Rejected {
        reason: String,
    },
}
