//! # Tweak Client
//! A client that mirrors tweak items collected from a server, forwards
//! writes to it and notifies local observers of every confirmed change.

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
        Buffer, BufferData, CallbackError, CallbackFailure, ConnectionConfig, ConnectionState,
        ElementType, EndpointConfig, EventObserver, Features, FnEventObserver, FnObserver,
        ItemDescriptor, ItemId, ItemKey, ItemList, LocalHub, Metadata, Observer, Order, Role,
        StoreError, TransportError, TransportRegistry, TweakEvent, Value, ValueType,
        ValueWaiter, WaitError,
    };
}

mod client;
mod client_config;
mod connection;
mod error;

pub use client::Client;
pub use client_config::ClientConfig;
pub use error::TweakClientError;

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub use tweak_shared::TcpClientSocket;
    }
}
