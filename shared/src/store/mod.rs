mod error;
mod item;
mod item_list;
mod store;

pub use error::{ItemKey, StoreError};
pub use item::{Change, ItemDescriptor, ItemOptions, ItemRecord, Mirrored};
pub use item_list::ItemList;
pub use store::ItemStore;
