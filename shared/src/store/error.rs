use std::fmt;

use thiserror::Error;

use tweak_serde::{BitReader, BitWrite, LengthPrefix, Serde, SerdeErr, UnsignedInteger};

use crate::{types::ItemId, value::ValueType};

/// Addresses an item either by id or by uri
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Id(ItemId),
    Uri(String),
}

impl From<ItemId> for ItemKey {
    fn from(id: ItemId) -> Self {
        ItemKey::Id(id)
    }
}

impl From<&str> for ItemKey {
    fn from(uri: &str) -> Self {
        ItemKey::Uri(uri.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(uri: String) -> Self {
        ItemKey::Uri(uri)
    }
}

impl From<&String> for ItemKey {
    fn from(uri: &String) -> Self {
        ItemKey::Uri(uri.clone())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Id(id) => write!(f, "item {}", id),
            ItemKey::Uri(uri) => write!(f, "uri '{}'", uri),
        }
    }
}

impl Serde for ItemKey {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            ItemKey::Id(id) => {
                writer.write_bit(false);
                id.ser(writer);
            }
            ItemKey::Uri(uri) => {
                writer.write_bit(true);
                uri.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(ItemKey::Uri(String::de(reader)?))
        } else {
            Ok(ItemKey::Id(ItemId::de(reader)?))
        }
    }
}

/// Errors returned synchronously by item store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No live item has this id or uri
    #[error("No item found for {key}")]
    NotFound {
        key: ItemKey,
    },

    /// The uri is already taken in this store
    #[error("An item already exists at uri '{uri}'")]
    UriConflict {
        uri: String,
    },

    /// Value type differs from the item's declared type
    #[error("Type mismatch: item holds {expected}, got {actual}")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },

    /// Buffer shape differs from the item's declared shape
    #[error("Shape mismatch: expected dimensions {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl StoreError {
    pub fn not_found(key: impl Into<ItemKey>) -> Self {
        StoreError::NotFound { key: key.into() }
    }
}

fn ser_shape(shape: &[usize], writer: &mut dyn BitWrite) {
    LengthPrefix::new(shape.len() as u64).ser(writer);
    for dim in shape {
        LengthPrefix::new(*dim as u64).ser(writer);
    }
}

fn de_shape(reader: &mut BitReader) -> Result<Vec<usize>, SerdeErr> {
    let rank: usize = LengthPrefix::de(reader)?.to()?;
    if rank > reader.bits_remaining() {
        return Err(SerdeErr::LengthOverflow {
            declared: rank as u64,
            remaining: reader.bytes_remaining(),
        });
    }
    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        shape.push(LengthPrefix::de(reader)?.to::<usize>()?);
    }
    Ok(shape)
}

impl Serde for StoreError {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            StoreError::NotFound { key } => {
                UnsignedInteger::<2>::new(0).ser(writer);
                key.ser(writer);
            }
            StoreError::UriConflict { uri } => {
                UnsignedInteger::<2>::new(1).ser(writer);
                uri.ser(writer);
            }
            StoreError::TypeMismatch { expected, actual } => {
                UnsignedInteger::<2>::new(2).ser(writer);
                expected.ser(writer);
                actual.ser(writer);
            }
            StoreError::ShapeMismatch { expected, actual } => {
                UnsignedInteger::<2>::new(3).ser(writer);
                ser_shape(expected, writer);
                ser_shape(actual, writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<2>::de(reader)?.to()?;
        match tag {
            0 => Ok(StoreError::NotFound {
                key: ItemKey::de(reader)?,
            }),
            1 => Ok(StoreError::UriConflict {
                uri: String::de(reader)?,
            }),
            2 => Ok(StoreError::TypeMismatch {
                expected: ValueType::de(reader)?,
                actual: ValueType::de(reader)?,
            }),
            _ => Ok(StoreError::ShapeMismatch {
                expected: de_shape(reader)?,
                actual: de_shape(reader)?,
            }),
        }
    }
}
