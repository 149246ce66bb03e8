use thiserror::Error;

use tweak_shared::{StoreError, TransportError};

/// Errors returned by a [`Server`](crate::Server) outside of plain store access
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TweakServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `listen` was already called on this server
    #[error("Server is already listening")]
    AlreadyListening,

    /// The IO worker thread could not be started
    #[error("Failed to start IO worker: {reason}")]
    Worker {
        reason: String,
    },
}
