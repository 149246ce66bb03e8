use std::{fmt, sync::Arc};

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    dispatch::Observer,
    metadata::Metadata,
    types::ItemId,
    value::{Value, ValueType},
};

/// Optional settings applied when an item is added
#[derive(Clone, Default)]
pub struct ItemOptions {
    pub metadata: Option<Metadata>,
    pub description: Option<String>,
    pub observer: Option<Arc<dyn Observer>>,
}

impl ItemOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }
}

/// What `list` reports about an item
#[derive(Clone, Debug, PartialEq)]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub uri: String,
    pub value_type: ValueType,
    pub metadata: Metadata,
    pub description: String,
}

/// A full snapshot of an item as sent to mirrors
#[derive(Clone, Debug, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub uri: String,
    pub description: String,
    pub metadata: Metadata,
    pub default_value: Value,
    pub value: Value,
    pub revision: u64,
}

impl ItemRecord {
    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

impl Serde for ItemRecord {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.uri.ser(writer);
        self.description.ser(writer);
        self.metadata.ser(writer);
        self.default_value.ser(writer);
        self.value.ser(writer);
        UnsignedVariableInteger::<7>::new(self.revision).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let record = Self {
            id: ItemId::de(reader)?,
            uri: String::de(reader)?,
            description: String::de(reader)?,
            metadata: Metadata::de(reader)?,
            default_value: Value::de(reader)?,
            value: Value::de(reader)?,
            revision: UnsignedVariableInteger::<7>::de(reader)?.to()?,
        };
        if record.default_value.value_type() != record.value.value_type() {
            return Err(SerdeErr::Inconsistent {
                type_name: "ItemRecord",
                reason: format!(
                    "default is {}, value is {}",
                    record.default_value.value_type(),
                    record.value.value_type()
                ),
            });
        }
        Ok(record)
    }
}

/// A committed mutation, handed to the dispatcher once the store lock is released
#[derive(Clone)]
pub struct Change {
    pub id: ItemId,
    pub revision: u64,
    pub value: Value,
    pub(crate) observer: Option<Arc<dyn Observer>>,
    pub(crate) newly_dirty: bool,
}

impl Change {
    /// True if the item was clean before this change, so a push must be scheduled
    pub fn newly_dirty(&self) -> bool {
        self.newly_dirty
    }
}

/// What mirroring a server record did to the local store
#[derive(Debug)]
pub struct Mirrored {
    pub id: ItemId,
    /// The item was not mirrored before
    pub added: bool,
    /// Another item that held the record's uri and was dropped for it
    pub replaced: Option<ItemId>,
    pub change: Option<Change>,
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("id", &self.id)
            .field("revision", &self.revision)
            .field("value", &self.value)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

pub(crate) struct Item {
    pub uri: String,
    pub id: ItemId,
    pub value_type: ValueType,
    pub value: Value,
    pub default_value: Value,
    pub metadata: Metadata,
    pub description: String,
    pub dirty: bool,
    pub revision: u64,
    pub observer: Option<Arc<dyn Observer>>,
}

impl Item {
    pub fn descriptor(&self) -> ItemDescriptor {
        ItemDescriptor {
            id: self.id,
            uri: self.uri.clone(),
            value_type: self.value_type,
            metadata: self.metadata.clone(),
            description: self.description.clone(),
        }
    }

    pub fn record(&self) -> ItemRecord {
        ItemRecord {
            id: self.id,
            uri: self.uri.clone(),
            description: self.description.clone(),
            metadata: self.metadata.clone(),
            default_value: self.default_value.clone(),
            value: self.value.clone(),
            revision: self.revision,
        }
    }

    pub fn change(&self, newly_dirty: bool) -> Change {
        Change {
            id: self.id,
            revision: self.revision,
            value: self.value.clone(),
            observer: self.observer.clone(),
            newly_dirty,
        }
    }
}
