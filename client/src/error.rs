use thiserror::Error;

use tweak_shared::{ProtocolError, StoreError, TransportError};

/// Errors returned by a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TweakClientError {
    /// Rejected by the local mirror or, for writes, by the server
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The IO worker thread could not be started
    #[error("Failed to start IO worker: {reason}")]
    Worker {
        reason: String,
    },
}

impl From<ProtocolError> for TweakClientError {
    fn from(err: ProtocolError) -> Self {
        TweakClientError::Transport(TransportError::Protocol(err))
    }
}
