use std::{collections::HashMap, fmt, sync::Arc};

use super::{ClientSocket, EndpointConfig, ServerSocket, TransportError, TransportFactory};
use crate::types::Role;

/// Maps transport names to the factories that build their sockets.
///
/// Created explicitly and handed to whoever resolves an [`EndpointConfig`];
/// there is no process-wide registry.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    factories: HashMap<String, Arc<dyn TransportFactory>>,
}

impl TransportRegistry {
    /// A registry with no transports at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every transport compiled into this build
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        cfg_if! {
            if #[cfg(feature = "transport_tcp")] {
                registry.register(super::tcp::TCP_TRANSPORT, super::tcp::TcpTransport);
            }
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: impl TransportFactory + 'static) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn factory(&self, name: &str) -> Result<&Arc<dyn TransportFactory>, TransportError> {
        self.factories
            .get(name)
            .ok_or_else(|| TransportError::UnknownTransport {
                name: name.to_string(),
            })
    }

    pub fn server_socket(
        &self,
        config: &EndpointConfig,
    ) -> Result<Box<dyn ServerSocket>, TransportError> {
        expect_role(config, Role::Server)?;
        self.factory(&config.transport_name)?
            .server_socket(&config.address)
    }

    pub fn client_socket(
        &self,
        config: &EndpointConfig,
    ) -> Result<Box<dyn ClientSocket>, TransportError> {
        expect_role(config, Role::Client)?;
        self.factory(&config.transport_name)?
            .client_socket(&config.address)
    }
}

fn expect_role(config: &EndpointConfig, role: Role) -> Result<(), TransportError> {
    if config.role == role {
        Ok(())
    } else {
        Err(TransportError::InvalidParams {
            params: format!("role={}", config.role),
            reason: format!("a {} endpoint needs role={}", role, role),
        })
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("TransportRegistry")
            .field("transports", &names)
            .finish()
    }
}
