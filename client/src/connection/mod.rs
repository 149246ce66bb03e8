pub mod connection;
pub mod handshake;
pub mod worker;
