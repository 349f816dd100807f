//! Client side of git's smart HTTP protocol, limited to what `clone` needs

mod http;
mod pkt_line;

pub use http::{HttpRemote, RefAdvertisement};
