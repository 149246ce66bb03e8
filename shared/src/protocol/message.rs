use tweak_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use super::{Features, UriPattern};
use crate::{
    store::{ItemRecord, StoreError},
    types::{ItemId, KindTag, RequestId, Role},
    value::Value,
};

/// Discriminant of a [`Message`], as it appears on the wire
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Hello,
    Welcome,
    Reject,
    Collect,
    CollectResponse,
    List,
    ListResponse,
    SetRequest,
    SetResponse,
    Update,
    Removed,
    Heartbeat,
    Disconnect,
}

impl MessageKind {
    const ALL: [MessageKind; 13] = [
        MessageKind::Hello,
        MessageKind::Welcome,
        MessageKind::Reject,
        MessageKind::Collect,
        MessageKind::CollectResponse,
        MessageKind::List,
        MessageKind::ListResponse,
        MessageKind::SetRequest,
        MessageKind::SetResponse,
        MessageKind::Update,
        MessageKind::Removed,
        MessageKind::Heartbeat,
        MessageKind::Disconnect,
    ];

    fn index(&self) -> u8 {
        match self {
            MessageKind::Hello => 0,
            MessageKind::Welcome => 1,
            MessageKind::Reject => 2,
            MessageKind::Collect => 3,
            MessageKind::CollectResponse => 4,
            MessageKind::List => 5,
            MessageKind::ListResponse => 6,
            MessageKind::SetRequest => 7,
            MessageKind::SetResponse => 8,
            MessageKind::Update => 9,
            MessageKind::Removed => 10,
            MessageKind::Heartbeat => 11,
            MessageKind::Disconnect => 12,
        }
    }
}

impl Serde for MessageKind {
    fn ser(&self, writer: &mut dyn BitWrite) {
        KindTag::new(self.index()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let index: usize = KindTag::de(reader)?.to()?;
        // SECURITY: 4 bits can name more kinds than exist
        MessageKind::ALL
            .get(index)
            .copied()
            .ok_or(SerdeErr::InvalidTag {
                type_name: "MessageKind",
                tag: index as u64,
            })
    }
}

/// Result for one uri of a collect request
#[derive(Clone, Debug, PartialEq)]
pub enum CollectEntry {
    Found(ItemRecord),
    NotFound,
}

impl Serde for CollectEntry {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            CollectEntry::Found(record) => {
                writer.write_bit(true);
                record.ser(writer);
            }
            CollectEntry::NotFound => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(CollectEntry::Found(ItemRecord::de(reader)?))
        } else {
            Ok(CollectEntry::NotFound)
        }
    }
}

/// Every message exchanged between a server and a client
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Client → server, opens the handshake
    Hello {
        version: u16,
        role: Role,
        features: Features,
    },
    /// Server → client, handshake accepted with the negotiated features
    Welcome {
        version: u16,
        features: Features,
    },
    /// Server → client, handshake refused
    Reject {
        reason: String,
    },
    Collect {
        request_id: RequestId,
        uris: Vec<String>,
    },
    /// One entry per requested uri, in request order
    CollectResponse {
        request_id: RequestId,
        entries: Vec<CollectEntry>,
    },
    List {
        request_id: RequestId,
        pattern: UriPattern,
    },
    ListResponse {
        request_id: RequestId,
        records: Vec<ItemRecord>,
    },
    SetRequest {
        request_id: RequestId,
        id: ItemId,
        value: Value,
    },
    SetResponse {
        request_id: RequestId,
        result: Result<(), StoreError>,
    },
    /// Server → subscribed clients, a committed value
    Update {
        id: ItemId,
        revision: u64,
        value: Value,
    },
    /// Server → subscribed clients, the item no longer exists
    Removed {
        id: ItemId,
    },
    Heartbeat,
    Disconnect,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello { .. } => MessageKind::Hello,
            Message::Welcome { .. } => MessageKind::Welcome,
            Message::Reject { .. } => MessageKind::Reject,
            Message::Collect { .. } => MessageKind::Collect,
            Message::CollectResponse { .. } => MessageKind::CollectResponse,
            Message::List { .. } => MessageKind::List,
            Message::ListResponse { .. } => MessageKind::ListResponse,
            Message::SetRequest { .. } => MessageKind::SetRequest,
            Message::SetResponse { .. } => MessageKind::SetResponse,
            Message::Update { .. } => MessageKind::Update,
            Message::Removed { .. } => MessageKind::Removed,
            Message::Heartbeat => MessageKind::Heartbeat,
            Message::Disconnect => MessageKind::Disconnect,
        }
    }

    /// Request id of a response message
    pub fn response_to(&self) -> Option<RequestId> {
        match self {
            Message::CollectResponse { request_id, .. }
            | Message::ListResponse { request_id, .. }
            | Message::SetResponse { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        Self::de(&mut BitReader::new(bytes))
    }
}

impl Serde for Message {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.kind().ser(writer);
        match self {
            Message::Hello {
                version,
                role,
                features,
            } => {
                version.ser(writer);
                role.ser(writer);
                features.ser(writer);
            }
            Message::Welcome { version, features } => {
                version.ser(writer);
                features.ser(writer);
            }
            Message::Reject { reason } => reason.ser(writer),
            Message::Collect { request_id, uris } => {
                request_id.ser(writer);
                uris.ser(writer);
            }
            Message::CollectResponse {
                request_id,
                entries,
            } => {
                request_id.ser(writer);
                entries.ser(writer);
            }
            Message::List {
                request_id,
                pattern,
            } => {
                request_id.ser(writer);
                pattern.ser(writer);
            }
            Message::ListResponse {
                request_id,
                records,
            } => {
                request_id.ser(writer);
                records.ser(writer);
            }
            Message::SetRequest {
                request_id,
                id,
                value,
            } => {
                request_id.ser(writer);
                id.ser(writer);
                value.ser(writer);
            }
            Message::SetResponse { request_id, result } => {
                request_id.ser(writer);
                match result {
                    Ok(()) => writer.write_bit(true),
                    Err(err) => {
                        writer.write_bit(false);
                        err.ser(writer);
                    }
                }
            }
            Message::Update {
                id,
                revision,
                value,
            } => {
                id.ser(writer);
                UnsignedVariableInteger::<7>::new(*revision).ser(writer);
                value.ser(writer);
            }
            Message::Removed { id } => id.ser(writer),
            Message::Heartbeat | Message::Disconnect => {}
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let message = match MessageKind::de(reader)? {
            MessageKind::Hello => Message::Hello {
                version: u16::de(reader)?,
                role: Role::de(reader)?,
                features: Features::de(reader)?,
            },
            MessageKind::Welcome => Message::Welcome {
                version: u16::de(reader)?,
                features: Features::de(reader)?,
            },
            MessageKind::Reject => Message::Reject {
                reason: String::de(reader)?,
            },
            MessageKind::Collect => Message::Collect {
                request_id: RequestId::de(reader)?,
                uris: Vec::de(reader)?,
            },
            MessageKind::CollectResponse => Message::CollectResponse {
                request_id: RequestId::de(reader)?,
                entries: Vec::de(reader)?,
            },
            MessageKind::List => Message::List {
                request_id: RequestId::de(reader)?,
                pattern: UriPattern::de(reader)?,
            },
            MessageKind::ListResponse => Message::ListResponse {
                request_id: RequestId::de(reader)?,
                records: Vec::de(reader)?,
            },
            MessageKind::SetRequest => Message::SetRequest {
                request_id: RequestId::de(reader)?,
                id: ItemId::de(reader)?,
                value: Value::de(reader)?,
            },
            MessageKind::SetResponse => {
                let request_id = RequestId::de(reader)?;
                let result = if reader.read_bit()? {
                    Ok(())
                } else {
                    Err(StoreError::de(reader)?)
                };
                Message::SetResponse { request_id, result }
            }
            MessageKind::Update => Message::Update {
                id: ItemId::de(reader)?,
                revision: UnsignedVariableInteger::<7>::de(reader)?.to()?,
                value: Value::de(reader)?,
            },
            MessageKind::Removed => Message::Removed {
                id: ItemId::de(reader)?,
            },
            MessageKind::Heartbeat => Message::Heartbeat,
            MessageKind::Disconnect => Message::Disconnect,
        };
        Ok(message)
    }
}
