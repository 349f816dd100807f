//! Git object model and the canonical `<type> <len>\0<payload>` framing

mod commit;
mod id;
mod tree;

use std::{fmt, str::FromStr};

pub use commit::{Commit, Signature};
pub use id::{hash_canonical, ObjectId, OBJECT_ID_LEN};
pub use tree::{FileMode, Tree, TreeEntry};

use crate::error::{Error, Result};

/// The three object types this store understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    /// Map the 3-bit type code of a pack entry header.
    ///
    /// Tags (4) and both delta encodings (6, 7) are rejected rather than
    /// decoded as something else.
    pub fn from_pack_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ObjectKind::Commit),
            2 => Ok(ObjectKind::Tree),
            3 => Ok(ObjectKind::Blob),
            other => Err(Error::UnsupportedObjectType(other)),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            other => Err(Error::UnknownObjectType(other.to_string())),
        }
    }
}

/// An object's type and payload, without its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl RawObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Serialize to the canonical form that is hashed and stored
    pub fn to_canonical(&self) -> Vec<u8> {
        let header = format!("{} {}\0", self.kind, self.data.len());
        let mut result = Vec::with_capacity(header.len() + self.data.len());
        result.extend_from_slice(header.as_bytes());
        result.extend_from_slice(&self.data);
        result
    }

    /// Parse canonical bytes, checking the declared length against the payload
    pub fn from_canonical(content: &[u8]) -> Result<Self> {
        let null_pos = content
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::MalformedObject("no null terminator in header".into()))?;

        let header = std::str::from_utf8(&content[..null_pos])
            .map_err(|_| Error::MalformedObject("header is not valid UTF-8".into()))?;

        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| Error::MalformedObject(format!("invalid header: {:?}", header)))?;

        let kind: ObjectKind = kind.parse()?;

        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedObject(format!("invalid length: {:?}", len)));
        }
        let declared: usize = len
            .parse()
            .map_err(|_| Error::MalformedObject(format!("length out of range: {}", len)))?;

        let data = &content[null_pos + 1..];
        if data.len() != declared {
            return Err(Error::MalformedObject(format!(
                "declared {} bytes but found {}",
                declared,
                data.len()
            )));
        }

        Ok(Self {
            kind,
            data: data.to_vec(),
        })
    }

    /// Fingerprint of the canonical form
    pub fn id(&self) -> ObjectId {
        hash_canonical(&self.to_canonical())
    }
}

/// A fully parsed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
        }
    }

    pub fn to_raw(&self) -> RawObject {
        let data = match self {
            Object::Blob(data) => data.clone(),
            Object::Tree(tree) => tree.encode(),
            Object::Commit(commit) => commit.encode(),
        };
        RawObject::new(self.kind(), data)
    }

    pub fn from_raw(raw: RawObject) -> Result<Self> {
        match raw.kind {
            ObjectKind::Blob => Ok(Object::Blob(raw.data)),
            ObjectKind::Tree => Ok(Object::Tree(Tree::decode(&raw.data)?)),
            ObjectKind::Commit => Ok(Object::Commit(Commit::parse(&raw.data)?)),
        }
    }
}
