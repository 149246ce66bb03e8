use std::sync::Arc;

use log::debug;

use crate::{
    dispatch::{
        CallbackError, Dispatcher, EventObserver, FnObserver, Observer, TweakEvent, ValueWaiter,
    },
    store::{Change, ItemKey, ItemOptions, ItemRecord, ItemStore, StoreError},
    types::ItemId,
    value::Value,
};

/// A store and the dispatcher that serves it, passed explicitly to
/// whatever needs to read, mutate or observe items.
pub struct TweakContext {
    store: ItemStore,
    dispatcher: Dispatcher,
}

impl TweakContext {
    pub fn new() -> Self {
        Self {
            store: ItemStore::new(),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn add(
        &self,
        uri: &str,
        initial: Value,
        options: ItemOptions,
    ) -> Result<ItemId, StoreError> {
        self.store.add(uri, initial, options)
    }

    /// Commits a value and queues its observer. The value is readable from
    /// the store as soon as this returns.
    pub fn set(&self, key: impl Into<ItemKey>, value: Value) -> Result<Change, StoreError> {
        let change = self.store.set(key, value)?;
        self.dispatcher.enqueue(change.clone());
        Ok(change)
    }

    /// Sets the item back to the value it was created with
    pub fn reset(&self, key: impl Into<ItemKey>) -> Result<Change, StoreError> {
        let key = key.into();
        let default_value = self.store.default_value(key.clone())?;
        self.set(key, default_value)
    }

    pub fn remove(&self, key: impl Into<ItemKey>) -> Result<ItemId, StoreError> {
        let id = self.store.remove(key)?;
        self.dispatcher.item_removed(id);
        Ok(id)
    }

    pub fn set_observer(
        &self,
        key: impl Into<ItemKey>,
        observer: impl Observer + 'static,
    ) -> Result<ItemId, StoreError> {
        self.store.set_observer(key, Some(Arc::new(observer)))
    }

    pub fn on_change<F>(&self, key: impl Into<ItemKey>, callback: F) -> Result<ItemId, StoreError>
    where
        F: Fn(ItemId, &Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.set_observer(key, FnObserver::new(callback))
    }

    pub fn clear_observer(&self, key: impl Into<ItemKey>) -> Result<ItemId, StoreError> {
        self.store.set_observer(key, None)
    }

    /// Returns a waiter that resolves once the item holds `target`,
    /// immediately if it already does.
    pub fn wait_for(
        &self,
        key: impl Into<ItemKey>,
        target: Value,
    ) -> Result<ValueWaiter, StoreError> {
        let key = key.into();
        let id = self.store.check_value(key, &target)?;
        // register before reading so a concurrent change can't slip between
        let (waiter, sender) = self.dispatcher.register_waiter(id, target.clone());
        if self.store.get(id)? == target {
            let _ = sender.try_send(target);
        }
        Ok(waiter)
    }

    /// Sets the observer for endpoint events, or clears it with `None`
    pub fn set_event_observer(&self, observer: Option<Arc<dyn EventObserver>>) {
        self.dispatcher.set_event_observer(observer);
    }

    pub fn notify(&self, event: TweakEvent) {
        self.dispatcher.notify(event);
    }

    // Mirror side

    pub fn apply_record(&self, record: ItemRecord) -> ItemId {
        let mirrored = self.store.mirror_insert(record);
        if let Some(stale) = mirrored.replaced {
            self.dispatcher.item_removed(stale);
            self.dispatcher.notify(TweakEvent::ItemRemoved(stale));
        }
        if mirrored.added {
            self.dispatcher.notify(TweakEvent::ItemAdded(mirrored.id));
        }
        if let Some(change) = mirrored.change {
            self.dispatcher.enqueue(change);
        }
        mirrored.id
    }

    /// Returns whether the update was newer than the mirror and got applied
    pub fn apply_update(&self, id: ItemId, revision: u64, value: Value) -> bool {
        match self.store.mirror_update(id, revision, value) {
            Some(change) => {
                self.dispatcher.enqueue(change);
                true
            }
            None => false,
        }
    }

    pub fn apply_removed(&self, id: ItemId) -> bool {
        let removed = self.store.mirror_remove(id);
        if removed {
            debug!("Mirror of {} removed", id);
            self.dispatcher.item_removed(id);
            self.dispatcher.notify(TweakEvent::ItemRemoved(id));
        }
        removed
    }
}

impl Default for TweakContext {
    fn default() -> Self {
        Self::new()
    }
}
