use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{debug, trace, warn};

use super::{
    item::Item, Change, ItemDescriptor, ItemKey, ItemList, ItemOptions, ItemRecord, Mirrored,
    StoreError,
};
use crate::{dispatch::Observer, types::ItemId, value::Value};

/// The uri/id → item mapping owned by one endpoint.
///
/// On a server this is the authoritative copy; on a client it holds mirrors
/// of the items collected so far. All state sits behind one store-wide lock,
/// which is never held while observers run or packets are sent.
pub struct ItemStore {
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    items: HashMap<ItemId, Item>,
    uris: BTreeMap<String, ItemId>,
    next_id: ItemId,
}

impl StoreInner {
    fn resolve(&self, key: &ItemKey) -> Result<ItemId, StoreError> {
        match key {
            ItemKey::Id(id) if self.items.contains_key(id) => Ok(*id),
            ItemKey::Uri(uri) => self
                .uris
                .get(uri)
                .copied()
                .ok_or_else(|| StoreError::not_found(key.clone())),
            ItemKey::Id(_) => Err(StoreError::not_found(key.clone())),
        }
    }

    fn item(&self, key: &ItemKey) -> Result<&Item, StoreError> {
        let id = self.resolve(key)?;
        self.items
            .get(&id)
            .ok_or_else(|| StoreError::not_found(key.clone()))
    }

    fn item_mut(&mut self, key: &ItemKey) -> Result<&mut Item, StoreError> {
        let id = self.resolve(key)?;
        self.items
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(key.clone()))
    }

    fn unlink(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        self.uris.remove(&item.uri);
        Some(item)
    }
}

/// Type and shape must both match for a value to replace `current`
fn check_compatible(current: &Value, incoming: &Value) -> Result<(), StoreError> {
    if current.value_type() != incoming.value_type() {
        return Err(StoreError::TypeMismatch {
            expected: current.value_type(),
            actual: incoming.value_type(),
        });
    }
    if let (Some(expected), Some(actual)) = (current.shape(), incoming.shape()) {
        if expected != actual {
            return Err(StoreError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
    }
    Ok(())
}

impl ItemStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                items: HashMap::new(),
                uris: BTreeMap::new(),
                next_id: ItemId::FIRST,
            }),
        }
    }

    // A panicking writer never leaves an item half-updated, so poisoning is recoverable.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an item. Its type is taken from `initial`, which also becomes
    /// the default value.
    pub fn add(
        &self,
        uri: &str,
        initial: Value,
        options: ItemOptions,
    ) -> Result<ItemId, StoreError> {
        let metadata = options.metadata.unwrap_or_default();
        if let Some(dimensions) = metadata.dimensions() {
            let actual = initial.shape().unwrap_or(&[]);
            if initial.shape().is_none() || actual != dimensions {
                return Err(StoreError::ShapeMismatch {
                    expected: dimensions.to_vec(),
                    actual: actual.to_vec(),
                });
            }
        }

        let mut inner = self.write();
        if inner.uris.contains_key(uri) {
            return Err(StoreError::UriConflict {
                uri: uri.to_string(),
            });
        }
        let id = inner.next_id;
        inner.next_id = id.next();

        let item = Item {
            uri: uri.to_string(),
            id,
            value_type: initial.value_type(),
            default_value: initial.clone(),
            value: initial,
            metadata,
            description: options.description.unwrap_or_default(),
            dirty: false,
            revision: 0,
            observer: options.observer,
        };
        debug!("Added {} {} at '{}'", item.value_type, id, uri);
        inner.uris.insert(item.uri.clone(), id);
        inner.items.insert(id, item);
        Ok(id)
    }

    pub fn find(&self, uri: &str) -> Result<ItemId, StoreError> {
        self.read().resolve(&ItemKey::Uri(uri.to_string()))
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.read().items.contains_key(&id)
    }

    pub fn get(&self, key: impl Into<ItemKey>) -> Result<Value, StoreError> {
        Ok(self.read().item(&key.into())?.value.clone())
    }

    pub fn default_value(&self, key: impl Into<ItemKey>) -> Result<Value, StoreError> {
        Ok(self.read().item(&key.into())?.default_value.clone())
    }

    pub fn descriptor(&self, key: impl Into<ItemKey>) -> Result<ItemDescriptor, StoreError> {
        Ok(self.read().item(&key.into())?.descriptor())
    }

    pub fn record(&self, key: impl Into<ItemKey>) -> Result<ItemRecord, StoreError> {
        Ok(self.read().item(&key.into())?.record())
    }

    /// Validates `value` against the item without committing anything
    pub fn check_value(&self, key: impl Into<ItemKey>, value: &Value) -> Result<ItemId, StoreError> {
        let inner = self.read();
        let item = inner.item(&key.into())?;
        check_compatible(&item.value, value)?;
        Ok(item.id)
    }

    /// Commits a new value. The returned [`Change`] must be handed to the
    /// dispatcher; the store never calls observers itself.
    pub fn set(&self, key: impl Into<ItemKey>, value: Value) -> Result<Change, StoreError> {
        let mut inner = self.write();
        let item = inner.item_mut(&key.into())?;
        check_compatible(&item.value, &value)?;
        item.value = value;
        item.revision += 1;
        let newly_dirty = !item.dirty;
        item.dirty = true;
        trace!("Set {} to {} (revision {})", item.id, item.value, item.revision);
        Ok(item.change(newly_dirty))
    }

    /// Permanently invalidates the item's id and uri
    pub fn remove(&self, key: impl Into<ItemKey>) -> Result<ItemId, StoreError> {
        let mut inner = self.write();
        let id = inner.resolve(&key.into())?;
        if let Some(item) = inner.unlink(id) {
            debug!("Removed {} at '{}'", id, item.uri);
        }
        Ok(id)
    }

    /// Snapshot of every item accepted by `predicate`, ordered by uri
    pub fn list(&self, predicate: impl Fn(&ItemDescriptor) -> bool) -> ItemList {
        let inner = self.read();
        let items = inner
            .uris
            .values()
            .filter_map(|id| inner.items.get(id))
            .map(Item::descriptor)
            .filter(|descriptor| predicate(descriptor))
            .collect();
        ItemList::new(items)
    }

    /// Full records of every item accepted by `predicate`, ordered by uri
    pub fn records(&self, predicate: impl Fn(&ItemDescriptor) -> bool) -> Vec<ItemRecord> {
        let inner = self.read();
        inner
            .uris
            .values()
            .filter_map(|id| inner.items.get(id))
            .filter(|item| predicate(&item.descriptor()))
            .map(Item::record)
            .collect()
    }

    pub fn set_observer(
        &self,
        key: impl Into<ItemKey>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<ItemId, StoreError> {
        let mut inner = self.write();
        let item = inner.item_mut(&key.into())?;
        item.observer = observer;
        Ok(item.id)
    }

    /// Clears the dirty flag and returns the value to propagate, if any
    pub fn take_dirty(&self, id: ItemId) -> Option<(u64, Value)> {
        let mut inner = self.write();
        let item = inner.items.get_mut(&id)?;
        if !item.dirty {
            return None;
        }
        item.dirty = false;
        Some((item.revision, item.value.clone()))
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    // Mirror maintenance, driven by messages from the authoritative store

    /// Inserts or refreshes a mirrored item. Returns the change to dispatch
    /// if the mirrored value moved forward.
    pub fn mirror_insert(&self, record: ItemRecord) -> Mirrored {
        let mut inner = self.write();
        let id = record.id;

        if let Some(item) = inner.items.get_mut(&id) {
            item.metadata = record.metadata;
            item.description = record.description;
            item.default_value = record.default_value;
            let change = if record.revision <= item.revision
                && item.value_type == record.value.value_type()
            {
                None
            } else {
                item.value_type = record.value.value_type();
                item.value = record.value;
                item.revision = record.revision;
                Some(item.change(false))
            };
            return Mirrored {
                id,
                added: false,
                replaced: None,
                change,
            };
        }

        // the server replaced whatever used to live at this uri
        let replaced = inner.uris.get(&record.uri).copied();
        if let Some(stale) = replaced {
            debug!("Mirror of '{}' moved from {} to {}", record.uri, stale, id);
            inner.unlink(stale);
        }

        let item = Item {
            uri: record.uri,
            id,
            value_type: record.value.value_type(),
            value: record.value,
            default_value: record.default_value,
            metadata: record.metadata,
            description: record.description,
            dirty: false,
            revision: record.revision,
            observer: None,
        };
        let change = item.change(false);
        inner.uris.insert(item.uri.clone(), id);
        inner.items.insert(id, item);
        Mirrored {
            id,
            added: true,
            replaced,
            change: Some(change),
        }
    }

    /// Applies a pushed value if it is newer than the mirrored one
    pub fn mirror_update(&self, id: ItemId, revision: u64, value: Value) -> Option<Change> {
        let mut inner = self.write();
        let item = inner.items.get_mut(&id)?;
        if revision <= item.revision {
            trace!(
                "Dropping stale update for {} (revision {} <= {})",
                id,
                revision,
                item.revision
            );
            return None;
        }
        if let Err(err) = check_compatible(&item.value, &value) {
            warn!("Dropping update for {}: {}", id, err);
            return None;
        }
        item.value = value;
        item.revision = revision;
        Some(item.change(false))
    }

    pub fn mirror_remove(&self, id: ItemId) -> bool {
        self.write().unlink(id).is_some()
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}
