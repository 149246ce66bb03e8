mod server;
mod server_config;
mod worker;

pub use server::Server;
pub use server_config::ServerConfig;
