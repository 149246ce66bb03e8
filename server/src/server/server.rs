use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

use log::{info, warn};
use smol::channel::{self, Receiver, Sender};

use tweak_shared::{
    CallbackError, EndpointConfig, ItemDescriptor, ItemId, ItemKey, ItemList, ItemOptions,
    Observer, ServerSocket, StoreError, TransportRegistry, TweakContext, Value, ValueWaiter,
};

use super::{
    worker::{ServerJob, ServerWorker},
    ServerConfig,
};
use crate::TweakServerError;

/// The authoritative end of a tweak link.
///
/// Items are created, changed and removed here; connected clients mirror
/// whatever they collect or list and receive pushed updates. Network I/O
/// happens on a dedicated worker thread, started by [`Server::listen`].
pub struct Server {
    config: ServerConfig,
    context: Arc<TweakContext>,
    jobs: Sender<ServerJob>,
    // taken by the worker on listen
    job_receiver: Mutex<Option<Receiver<ServerJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    connection_count: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new Server. It serves nobody until [`Server::listen`] is called.
    pub fn new(config: ServerConfig) -> Self {
        let (jobs, job_receiver) = channel::unbounded();
        Self {
            config,
            context: Arc::new(TweakContext::new()),
            jobs,
            job_receiver: Mutex::new(Some(job_receiver)),
            worker: Mutex::new(None),
            connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Starts serving clients over the given socket
    pub fn listen(&self, socket: Box<dyn ServerSocket>) -> Result<(), TweakServerError> {
        let mut worker = lock(&self.worker);
        let mut job_receiver = lock(&self.job_receiver);
        if job_receiver.is_none() {
            return Err(TweakServerError::AlreadyListening);
        }
        let (sender, socket_events) = socket.listen()?;
        let Some(job_receiver) = job_receiver.take() else {
            return Err(TweakServerError::AlreadyListening);
        };

        let server_worker = ServerWorker::new(
            self.context.clone(),
            self.config.clone(),
            sender,
            self.connection_count.clone(),
        );
        let handle = thread::Builder::new()
            .name("tweak-server-io".to_string())
            .spawn(move || server_worker.run(socket_events, job_receiver))
            .map_err(|err| TweakServerError::Worker {
                reason: err.to_string(),
            })?;
        *worker = Some(handle);
        info!("Server listening");
        Ok(())
    }

    /// Resolves `endpoint` through `registry` and listens on the result
    pub fn listen_endpoint(
        &self,
        registry: &TransportRegistry,
        endpoint: &EndpointConfig,
    ) -> Result<(), TweakServerError> {
        let socket = registry.server_socket(endpoint)?;
        info!(
            "Server endpoint {} at '{}'",
            endpoint.transport_name, endpoint.address
        );
        self.listen(socket)
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.worker).is_some()
    }

    /// Number of clients that completed the handshake and are still attached
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &Arc<TweakContext> {
        &self.context
    }

    // Items

    pub fn add(
        &self,
        uri: &str,
        initial: impl Into<Value>,
        options: ItemOptions,
    ) -> Result<ItemId, StoreError> {
        self.context.add(uri, initial.into(), options)
    }

    pub fn find(&self, uri: &str) -> Result<ItemId, StoreError> {
        self.context.store().find(uri)
    }

    pub fn get(&self, key: impl Into<ItemKey>) -> Result<Value, StoreError> {
        self.context.store().get(key)
    }

    pub fn descriptor(&self, key: impl Into<ItemKey>) -> Result<ItemDescriptor, StoreError> {
        self.context.store().descriptor(key)
    }

    /// Commits the value locally and schedules its push to subscribed clients
    pub fn set(&self, key: impl Into<ItemKey>, value: impl Into<Value>) -> Result<(), StoreError> {
        let change = self.context.set(key, value.into())?;
        if change.newly_dirty() {
            self.schedule(ServerJob::Push(change.id));
        }
        Ok(())
    }

    /// Restores the value the item was created with
    pub fn reset(&self, key: impl Into<ItemKey>) -> Result<(), StoreError> {
        let change = self.context.reset(key)?;
        if change.newly_dirty() {
            self.schedule(ServerJob::Push(change.id));
        }
        Ok(())
    }

    /// Removes the item for good and notifies subscribed clients
    pub fn remove(&self, key: impl Into<ItemKey>) -> Result<ItemId, StoreError> {
        let id = self.context.remove(key)?;
        self.schedule(ServerJob::Removed(id));
        Ok(id)
    }

    pub fn list(&self, predicate: impl Fn(&ItemDescriptor) -> bool) -> ItemList {
        self.context.store().list(predicate)
    }

    // Observers

    pub fn set_observer(
        &self,
        key: impl Into<ItemKey>,
        observer: impl Observer + 'static,
    ) -> Result<ItemId, StoreError> {
        self.context.set_observer(key, observer)
    }

    pub fn on_change<F>(&self, key: impl Into<ItemKey>, callback: F) -> Result<ItemId, StoreError>
    where
        F: Fn(ItemId, &Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.context.on_change(key, callback)
    }

    pub fn clear_observer(&self, key: impl Into<ItemKey>) -> Result<ItemId, StoreError> {
        self.context.clear_observer(key)
    }

    pub fn wait_for(
        &self,
        key: impl Into<ItemKey>,
        target: impl Into<Value>,
    ) -> Result<ValueWaiter, StoreError> {
        self.context.wait_for(key, target.into())
    }

    /// Blocks until every observer call queued so far has run
    pub fn flush_observers(&self) {
        self.context.dispatcher().flush();
    }

    /// Number of observer calls that returned an error or panicked
    pub fn callback_failures(&self) -> u64 {
        self.context.dispatcher().failure_count()
    }

    // Lifecycle

    /// Disconnects every client and stops the IO worker
    pub fn shutdown(&self) {
        let Some(handle) = lock(&self.worker).take() else {
            return;
        };
        let _ = self.jobs.try_send(ServerJob::Shutdown);
        if handle.join().is_err() {
            warn!("Server IO worker panicked");
        }
        self.connection_count.store(0, Ordering::SeqCst);
    }

    fn schedule(&self, job: ServerJob) {
        if self.jobs.try_send(job).is_err() {
            warn!("Server IO worker is gone, dropping job");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
