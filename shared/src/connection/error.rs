use thiserror::Error;

use super::ConnectionState;

/// General connection-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The state machine does not allow this step
    #[error("Illegal connection state transition from {from} to {to}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}
