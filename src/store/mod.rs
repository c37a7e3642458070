pub mod image;
pub mod maintenance;
pub mod wal;

pub use image::{StoreImage, StoreMetadata, STORE_FORMAT_VERSION};
pub use wal::{wal_path, WalEntry, WalManager};
