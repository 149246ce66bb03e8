mod config;
mod error;
mod requests;
mod state;
mod timer;

pub use config::ConnectionConfig;
pub use error::ConnectionError;
pub use requests::PendingRequests;
pub use state::ConnectionState;
pub use timer::Timer;
