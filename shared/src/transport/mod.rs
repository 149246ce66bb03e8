mod endpoint_config;
mod error;
mod local;
mod registry;
mod socket;

pub use endpoint_config::{EndpointConfig, DEFAULT_PORT};
pub use error::TransportError;
pub use local::{LocalClientSocket, LocalHub, LocalServerSocket, LOCAL_TRANSPORT};
pub use registry::TransportRegistry;
pub use socket::{
    ClientPacketSender, ClientSocket, ClientSocketEvent, ClientSocketParts, ServerPacketSender,
    ServerSocket, ServerSocketEvent, ServerSocketParts, TransportFactory,
};

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        mod tcp;
        pub use tcp::{TcpClientSocket, TcpServerSocket, TcpTransport, MAX_FRAME_BYTES, TCP_TRANSPORT};
    }
}
