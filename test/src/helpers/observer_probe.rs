use std::sync::{Arc, Mutex};

use tweak_shared::{CallbackError, FnObserver, ItemId, Observer, Value};

/// Records every notification an observer receives
#[derive(Clone, Default)]
pub struct ObserverProbe {
    seen: Arc<Mutex<Vec<(ItemId, Value)>>>,
}

impl ObserverProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer that records into this probe
    pub fn observer(&self) -> impl Observer + 'static {
        let seen = self.seen.clone();
        FnObserver::new(move |id, value: &Value| -> Result<(), CallbackError> {
            seen.lock().unwrap().push((id, value.clone()));
            Ok(())
        })
    }

    /// An observer that records, then fails with `message`
    pub fn failing_observer(&self, message: &'static str) -> impl Observer + 'static {
        let seen = self.seen.clone();
        FnObserver::new(move |id, value: &Value| -> Result<(), CallbackError> {
            seen.lock().unwrap().push((id, value.clone()));
            Err(CallbackError::new(message))
        })
    }

    pub fn values(&self) -> Vec<Value> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Value> {
        self.seen
            .lock()
            .unwrap()
            .last()
            .map(|(_, value)| value.clone())
    }
}
