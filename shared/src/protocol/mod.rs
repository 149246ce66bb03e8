mod error;
mod features;
mod message;
mod uri_pattern;

pub use error::ProtocolError;
pub use features::Features;
pub use message::{CollectEntry, Message, MessageKind};
pub use uri_pattern::UriPattern;
