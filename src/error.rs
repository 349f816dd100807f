use thiserror::Error;

/// Failures raised by the object model, the store, the pack decoder and the
/// remote transport.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Canonical bytes are truncated or their header does not parse.
    #[error("malformed object: {0}")]
    MalformedObject(String),

    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Stored bytes could not be inflated.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: String, reason: String },

    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("malformed commit: {0}")]
    MalformedCommit(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid pack header: {0}")]
    InvalidPackHeader(String),

    /// Pack type codes outside commit/tree/blob, including both delta kinds.
    #[error("unsupported pack object type code {0}")]
    UnsupportedObjectType(u8),

    /// The pack stream ended before an entry was complete.
    #[error("truncated pack entry: {0}")]
    TruncatedPackEntry(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
