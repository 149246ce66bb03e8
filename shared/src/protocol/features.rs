use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::value::Value;

/// Optional capabilities negotiated during the handshake
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Features {
    /// Peer understands buffer values
    pub vectors: bool,
}

impl Features {
    pub fn none() -> Self {
        Self { vectors: false }
    }

    /// Capabilities both sides support
    pub fn negotiate(&self, remote: &Features) -> Features {
        Features {
            vectors: self.vectors && remote.vectors,
        }
    }

    /// Whether a value of this kind may be shown to a peer with these features
    pub fn permits(&self, value: &Value) -> bool {
        self.vectors || !matches!(value, Value::Buffer(_))
    }
}

impl Default for Features {
    fn default() -> Self {
        Self { vectors: true }
    }
}

impl Serde for Features {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.vectors.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            vectors: bool::de(reader)?,
        })
    }
}
