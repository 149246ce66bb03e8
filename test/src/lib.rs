//! End-to-end harness for tweak servers and clients: an in-process server,
//! clients attached to it, and helpers for waiting on propagation.


pub use helpers::*;
