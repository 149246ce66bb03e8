use url::Url;

use super::{TransportError, LOCAL_TRANSPORT};
use crate::types::Role;

/// Port used when a uri doesn't name one
pub const DEFAULT_PORT: u16 = 7777;

/// Which transport to use, in which role, at which address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    pub transport_name: String,
    pub role: Role,
    pub address: String,
}

impl EndpointConfig {
    pub fn new(transport_name: impl Into<String>, role: Role, address: impl Into<String>) -> Self {
        Self {
            transport_name: transport_name.into(),
            role,
            address: address.into(),
        }
    }

    /// Builds a config from a connection type, a `key=value` parameter list
    /// and a uri, e.g. `("nng", "role=server", "tcp://0.0.0.0:7777/")`.
    ///
    /// For network connection types the uri scheme picks the transport and
    /// `host:port` becomes the address. The `local` connection type uses the
    /// uri verbatim as a hub address.
    pub fn from_params(
        connection_type: &str,
        params: &str,
        uri: &str,
    ) -> Result<Self, TransportError> {
        let invalid_params = |reason: &str| TransportError::InvalidParams {
            params: params.to_string(),
            reason: reason.to_string(),
        };

        let mut role = None;
        for pair in params
            .split([',', ';'])
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
        {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(invalid_params("expected key=value"));
            };
            match key.trim() {
                "role" => {
                    role = Some(
                        Role::parse(value.trim())
                            .ok_or_else(|| invalid_params("role must be server or client"))?,
                    )
                }
                other => log::debug!("Ignoring endpoint parameter '{}'", other),
            }
        }
        let role = role.ok_or_else(|| invalid_params("missing role"))?;

        if connection_type == LOCAL_TRANSPORT {
            return Ok(Self::new(LOCAL_TRANSPORT, role, uri));
        }

        let invalid_address = |reason: &str| TransportError::InvalidAddress {
            address: uri.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(uri).map_err(|err| invalid_address(&err.to_string()))?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid_address("missing host"))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);
        let address = if host.contains(':') {
            // bracketed IPv6 literal
            format!("[{}]:{}", host.trim_matches(['[', ']']), port)
        } else {
            format!("{}:{}", host, port)
        };
        Ok(Self::new(url.scheme(), role, address))
    }
}
