mod buffer;
mod element;
mod error;
mod value;

pub use buffer::{Buffer, BufferData, Element};
pub use element::{ElementType, Order};
pub use error::BufferError;
pub use value::{Value, ValueType};
