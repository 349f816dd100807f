mod compression;
mod filesystem;
mod traits;

pub use filesystem::FilesystemStorage;
pub use traits::{ObjectStore, RefStore, StorageBackend};
