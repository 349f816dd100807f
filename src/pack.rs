//! Git pack format support
//!
//! Decodes the non-delta subset of git's pack stream directly into loose
//! objects, so fetched objects keep their exact SHA-1 ids.

mod entry;
mod receive;

pub use entry::{EntryHeader, PackHeader};
pub use receive::{receive_pack, PackedObject};
