use std::{fmt, num::NonZeroU64};

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger};

/// Stable identifier of an item within a store. Never zero, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(NonZeroU64);

impl ItemId {
    /// The first id a store hands out
    pub const FIRST: ItemId = ItemId(NonZeroU64::MIN);

    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn to_u64(&self) -> u64 {
        self.0.get()
    }

    /// The id allocated after this one. Saturates at `u64::MAX`.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Serde for ItemId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.0.get()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let raw: u64 = UnsignedVariableInteger::<7>::de(reader)?.to()?;
        // SECURITY: zero is never allocated, reject it instead of panicking later
        Self::new(raw).ok_or(SerdeErr::InvalidTag {
            type_name: "ItemId",
            tag: 0,
        })
    }
}

/// Correlates a request with its response on one connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Serde for RequestId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(UnsignedVariableInteger::<7>::de(reader)?.to()?))
    }
}

/// Transport-level handle for one remote peer of a server socket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey(u64);

impl PeerKey {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn invert(self) -> Self {
        match self {
            Role::Server => Role::Client,
            Role::Client => Role::Server,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "server" => Some(Role::Server),
            "client" => Some(Role::Client),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => write!(f, "server"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl Serde for Role {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self == Role::Server);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Role::Server)
        } else {
            Ok(Role::Client)
        }
    }
}

/// Wire version spoken by this build. Peers must match exactly.
pub const PROTOCOL_VERSION: u16 = 2;

pub(crate) type KindTag = UnsignedInteger<4>;
