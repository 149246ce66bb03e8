use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use log::{info, warn};

use tweak_shared::{
    CallbackError, ClientSocket, CollectEntry, ConnectionState, EndpointConfig, EventObserver,
    Features, FnEventObserver, ItemDescriptor, ItemId, ItemKey, ItemList, Message, Observer,
    ProtocolError, StoreError, TransportRegistry, TweakContext, TweakEvent, UriPattern, Value,
    ValueWaiter,
};

use crate::{
    connection::{connection::ServerConnection, handshake::handshake, worker},
    ClientConfig, TweakClientError,
};

/// The mirroring end of a tweak link.
///
/// Items appear locally only after [`Client::collect`] or [`Client::list`]
/// and are kept current by updates pushed from the server. Writes are
/// requests: the local mirror changes once the server confirms them.
pub struct Client {
    config: ClientConfig,
    context: Arc<TweakContext>,
    connection: Arc<ServerConnection>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Connects the socket, completes the handshake and starts the IO worker
    pub fn connect(
        config: ClientConfig,
        socket: Box<dyn ClientSocket>,
    ) -> Result<Self, TweakClientError> {
        Self::start(config, socket, None)
    }

    /// Like [`Client::connect`], with `observer` in place before the link
    /// comes up so it sees the initial `ConnectionChanged` event
    pub fn connect_with_events(
        config: ClientConfig,
        socket: Box<dyn ClientSocket>,
        observer: impl EventObserver + 'static,
    ) -> Result<Self, TweakClientError> {
        Self::start(config, socket, Some(Arc::new(observer)))
    }

    fn start(
        config: ClientConfig,
        socket: Box<dyn ClientSocket>,
        event_observer: Option<Arc<dyn EventObserver>>,
    ) -> Result<Self, TweakClientError> {
        let (sender, events) = socket.connect()?;
        let features = handshake(sender.as_ref(), &events, &config)?;

        let context = Arc::new(TweakContext::new());
        context.set_event_observer(event_observer);
        let connection = Arc::new(ServerConnection::new(
            sender,
            features,
            config.connection.heartbeat_interval,
            context.clone(),
        ));

        let worker_connection = connection.clone();
        let worker_context = context.clone();
        let connection_config = config.connection.clone();
        let handle = thread::Builder::new()
            .name("tweak-client-io".to_string())
            .spawn(move || {
                worker::run(worker_connection, worker_context, events, connection_config)
            })
            .map_err(|err| {
                connection.close(true);
                TweakClientError::Worker {
                    reason: err.to_string(),
                }
            })?;

        Ok(Self {
            config,
            context,
            connection,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Resolves `endpoint` through `registry` and connects to it
    pub fn connect_endpoint(
        config: ClientConfig,
        registry: &TransportRegistry,
        endpoint: &EndpointConfig,
    ) -> Result<Self, TweakClientError> {
        let socket = registry.client_socket(endpoint)?;
        info!(
            "Client endpoint {} at '{}'",
            endpoint.transport_name, endpoint.address
        );
        Self::connect(config, socket)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Features both sides agreed on during the handshake
    pub fn features(&self) -> Features {
        self.connection.features()
    }

    pub fn context(&self) -> &TweakContext {
        &self.context
    }

    // Requests

    /// Resolves a batch of uris in one round trip. Found items are mirrored
    /// and subscribed; the result has one entry per uri, in input order.
    pub fn collect(
        &self,
        uris: &[&str],
    ) -> Result<Vec<Result<ItemId, StoreError>>, TweakClientError> {
        let request_uris: Vec<String> = uris.iter().map(|uri| uri.to_string()).collect();
        let response = self.connection.request(
            "collect",
            self.config.connection.request_timeout,
            |request_id| Message::Collect {
                request_id,
                uris: request_uris,
            },
        )?;
        let entries = match response {
            Message::CollectResponse { entries, .. } => entries,
            other => return Err(invalid_response("collect", &other)),
        };
        if entries.len() != uris.len() {
            return Err(ProtocolError::InvalidResponse {
                reason: format!(
                    "collect of {} uri(s) answered with {} entries",
                    uris.len(),
                    entries.len()
                ),
            }
            .into());
        }

        Ok(entries
            .into_iter()
            .zip(uris)
            .map(|(entry, uri)| match entry {
                CollectEntry::Found(record) => Ok(record.id),
                CollectEntry::NotFound => Err(StoreError::not_found(*uri)),
            })
            .collect())
    }

    /// Mirrors and subscribes to every item matching `pattern`
    /// (`*`, `prefix*`, an exact uri, or `;`-separated clauses), then
    /// returns those also accepted by `predicate`, ordered by uri
    pub fn list(
        &self,
        pattern: &str,
        predicate: impl Fn(&ItemDescriptor) -> bool,
    ) -> Result<ItemList, TweakClientError> {
        let pattern = UriPattern::parse(pattern);
        let response = self.connection.request(
            "list",
            self.config.connection.request_timeout,
            |request_id| Message::List {
                request_id,
                pattern,
            },
        )?;
        let records = match response {
            Message::ListResponse { records, .. } => records,
            other => return Err(invalid_response("list", &other)),
        };
        let listed: HashSet<ItemId> = records.iter().map(|record| record.id).collect();
        Ok(self
            .context
            .store()
            .list(|descriptor| listed.contains(&descriptor.id) && predicate(descriptor)))
    }

    /// Asks the server to commit `value`. Returns once the server has
    /// answered; the mirror changes when the resulting update arrives.
    pub fn set(
        &self,
        key: impl Into<ItemKey>,
        value: impl Into<Value>,
    ) -> Result<(), TweakClientError> {
        let value = value.into();
        let id = self.context.store().check_value(key, &value)?;
        let response = self.connection.request(
            "set",
            self.config.connection.request_timeout,
            |request_id| Message::SetRequest {
                request_id,
                id,
                value,
            },
        )?;
        let result = match response {
            Message::SetResponse { result, .. } => result,
            other => return Err(invalid_response("set", &other)),
        };
        Ok(result?)
    }

    /// Asks the server to restore the item's default value
    pub fn reset(&self, key: impl Into<ItemKey>) -> Result<(), TweakClientError> {
        let key = key.into();
        let default_value = self.context.store().default_value(key.clone())?;
        self.set(key, default_value)
    }

    // Mirror

    pub fn find(&self, uri: &str) -> Result<ItemId, StoreError> {
        self.context.store().find(uri)
    }

    pub fn get(&self, key: impl Into<ItemKey>) -> Result<Value, StoreError> {
        self.context.store().get(key)
    }

    pub fn descriptor(&self, key: impl Into<ItemKey>) -> Result<ItemDescriptor, StoreError> {
        self.context.store().descriptor(key)
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

    /// Resolves once the mirrored item holds `target`
    pub fn wait_for(
        &self,
        key: impl Into<ItemKey>,
        target: impl Into<Value>,
    ) -> Result<ValueWaiter, StoreError> {
        self.context.wait_for(key, target.into())
    }

    /// Observes connection status changes and items entering or leaving
    /// the mirror
    pub fn set_event_observer(&self, observer: impl EventObserver + 'static) {
        self.context.set_event_observer(Some(Arc::new(observer)));
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(TweakEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.set_event_observer(FnEventObserver::new(callback));
    }

    pub fn clear_event_observer(&self) {
        self.context.set_event_observer(None);
    }

    pub fn flush_observers(&self) {
        self.context.dispatcher().flush();
    }

    pub fn callback_failures(&self) -> u64 {
        self.context.dispatcher().failure_count()
    }

    // Lifecycle

    /// Tells the server goodbye and closes the link. Outstanding requests
    /// fail with `ConnectionClosed`; the mirror keeps its last values.
    pub fn disconnect(&self) {
        self.connection.close(true);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Client IO worker panicked");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn invalid_response(operation: &str, response: &Message) -> TweakClientError {
    ProtocolError::InvalidResponse {
        reason: format!("{} answered with {:?}", operation, response.kind()),
    }
    .into()
}
