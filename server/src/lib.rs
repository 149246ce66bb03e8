//! # Tweak Server
//! An authoritative server that exposes named, typed, live-tunable items
//! ("tweaks") and keeps the mirrors of connected clients synchronized.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod shared {
    pub use tweak_shared::{
        Buffer, BufferData, CallbackError, ConnectionConfig, ConnectionState, ElementType, EndpointConfig,
        Features, FnObserver, ItemDescriptor, ItemId, ItemKey, ItemList, ItemOptions, LocalHub,
        Metadata, Observer, Order, Role, StoreError, TransportError, TransportRegistry, Value,
        ValueType, ValueWaiter, WaitError,
    };
}

mod connection;
mod error;
mod server;

pub use error::TweakServerError;
pub use server::{Server, ServerConfig};

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub use tweak_shared::{TcpServerSocket, TcpTransport};
    }
}
