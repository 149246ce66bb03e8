//! # Tweak Shared
//! Common functionality shared between tweak-server & tweak-client crates:
//! the value model, the item store, observer dispatch, the wire protocol and
//! the transports that carry it.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use tweak_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, LengthPrefix, Serde, SerdeErr,
    SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};

mod connection;
mod context;
mod dispatch;
mod metadata;
mod protocol;
mod store;
mod transport;
mod types;
mod value;

pub use connection::{ConnectionConfig, ConnectionError, ConnectionState, PendingRequests, Timer};
pub use context::TweakContext;
pub use dispatch::{
    CallbackError, CallbackFailure, Dispatcher, EventObserver, FnEventObserver, FnObserver,
    Observer, TweakEvent, ValueWaiter, WaitError,
};
pub use metadata::{ControlType, Layout, Metadata, MetadataError, MetadataOption};
pub use protocol::{CollectEntry, Features, Message, MessageKind, ProtocolError, UriPattern};
pub use store::{
    Change, ItemDescriptor, ItemKey, ItemList, ItemOptions, ItemRecord, ItemStore, Mirrored,
    StoreError,
};
pub use transport::{
    ClientPacketSender, ClientSocket, ClientSocketEvent, ClientSocketParts, EndpointConfig,
    LocalClientSocket, LocalHub, LocalServerSocket, ServerPacketSender, ServerSocket,
    ServerSocketEvent, ServerSocketParts, TransportError, TransportFactory, TransportRegistry,
    DEFAULT_PORT, LOCAL_TRANSPORT,
};
pub use types::{ItemId, PeerKey, RequestId, Role, PROTOCOL_VERSION};
pub use value::{Buffer, BufferData, BufferError, Element, ElementType, Order, Value, ValueType};

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub use transport::{TcpClientSocket, TcpServerSocket, TcpTransport, MAX_FRAME_BYTES, TCP_TRANSPORT};
    }
}
