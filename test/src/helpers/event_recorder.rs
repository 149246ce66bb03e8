use std::sync::{Arc, Mutex};

use tweak_shared::{CallbackError, EventObserver, FnEventObserver, TweakEvent};

/// Records every endpoint event a client reports
#[derive(Clone, Default)]
pub struct EventRecorder {
    seen: Arc<Mutex<Vec<TweakEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> impl EventObserver + 'static {
        let seen = self.seen.clone();
        FnEventObserver::new(move |event| -> Result<(), CallbackError> {
            seen.lock().unwrap().push(event);
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<TweakEvent> {
        self.seen.lock().unwrap().clone()
    }

    pub fn contains(&self, event: TweakEvent) -> bool {
        self.seen.lock().unwrap().contains(&event)
    }
}
