use std::fmt;

use log::trace;

use super::ConnectionError;

/// Lifecycle of one server/client connection.
///
/// `Connecting → Handshaking → Active → Closing → Closed`. A connection may
/// be abandoned before it is active, and every path ends in `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Handshaking,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (*self, next),
            (Connecting, Handshaking)
                | (Connecting, Closed)
                | (Handshaking, Active)
                | (Handshaking, Closing)
                | (Handshaking, Closed)
                | (Active, Closing)
                | (Closing, Closed)
        )
    }

    pub fn transition(&mut self, next: ConnectionState) -> Result<(), ConnectionError> {
        if !self.can_transition_to(next) {
            return Err(ConnectionError::IllegalTransition {
                from: *self,
                to: next,
            });
        }
        trace!("Connection {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    /// Walks through `Closing` to `Closed` from wherever the connection is
    pub fn close(&mut self) {
        if *self == ConnectionState::Active {
            *self = ConnectionState::Closing;
        }
        if *self != ConnectionState::Closed {
            trace!("Connection {} -> closed", self);
            *self = ConnectionState::Closed;
        }
    }

    pub fn is_active(&self) -> bool {
        *self == ConnectionState::Active
    }

    pub fn is_closed(&self) -> bool {
        *self == ConnectionState::Closed
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
