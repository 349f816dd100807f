//! Tree objects: `<mode> <name>\0<20-byte id>` entries in git sibling order

use std::cmp::Ordering;
use std::collections::HashSet;

use super::id::{ObjectId, OBJECT_ID_LEN};
use super::ObjectKind;
use crate::error::{Error, Result};

/// File mode of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// 100644
    Regular,
    /// 100755
    Executable,
    /// 120000
    Symlink,
    /// 40000
    Directory,
    /// 160000, a commit in another repository
    Submodule,
}

impl FileMode {
    pub fn from_octal(s: &str) -> Option<Self> {
        match s {
            "100644" => Some(FileMode::Regular),
            "100755" => Some(FileMode::Executable),
            "120000" => Some(FileMode::Symlink),
            "40000" => Some(FileMode::Directory),
            "160000" => Some(FileMode::Submodule),
            _ => None,
        }
    }

    /// Mode as written inside tree objects (no leading zero for directories)
    pub fn as_octal(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Directory => "40000",
            FileMode::Submodule => "160000",
        }
    }

    /// Kind of object the entry's id refers to
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            FileMode::Directory => ObjectKind::Tree,
            FileMode::Submodule => ObjectKind::Commit,
            _ => ObjectKind::Blob,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileMode::Directory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: FileMode,
    name: String,
    id: ObjectId,
}

impl TreeEntry {
    /// Names must be a single, non-empty path segment.
    pub fn new(mode: FileMode, name: String, id: ObjectId) -> Result<Self> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(Error::MalformedTree(format!("invalid entry name {:?}", name)));
        }
        Ok(Self { mode, name, id })
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Compare the way git orders siblings: a directory sorts as if its name
    /// ended in `/`.
    pub fn sibling_cmp(&self, other: &Self) -> Ordering {
        let a = self.name.as_bytes();
        let b = other.name.as_bytes();
        let common = a.len().min(b.len());
        match a[..common].cmp(&b[..common]) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let next = |name: &[u8], mode: FileMode| -> Option<u8> {
            match name.get(common) {
                Some(&byte) => Some(byte),
                None if mode.is_directory() => Some(b'/'),
                None => None,
            }
        };
        next(a, self.mode).cmp(&next(b, other.mode))
    }
}

/// A directory listing, always held in sibling order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(TreeEntry::sibling_cmp);
        Self { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_octal().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    /// Parse a tree payload. Entries must be in sibling order with no name
    /// repeated.
    pub fn decode(content: &[u8]) -> Result<Self> {
        let mut entries: Vec<TreeEntry> = Vec::new();
        let mut names = HashSet::new();
        let mut pos = 0;

        while pos < content.len() {
            let space = content[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::MalformedTree("missing space after mode".into()))?;
            let mode = std::str::from_utf8(&content[pos..pos + space])
                .ok()
                .and_then(FileMode::from_octal)
                .ok_or_else(|| {
                    Error::MalformedTree(format!(
                        "unknown mode {:?}",
                        String::from_utf8_lossy(&content[pos..pos + space])
                    ))
                })?;
            pos += space + 1;

            let null = content[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::MalformedTree("missing null after name".into()))?;
            let name = std::str::from_utf8(&content[pos..pos + null])
                .map_err(|_| Error::MalformedTree("entry name is not valid UTF-8".into()))?
                .to_string();
            pos += null + 1;

            let id_bytes = content
                .get(pos..pos + OBJECT_ID_LEN)
                .ok_or_else(|| Error::MalformedTree(format!("truncated id for {:?}", name)))?;
            let id = ObjectId::from_slice(id_bytes)?;
            pos += OBJECT_ID_LEN;

            let entry = TreeEntry::new(mode, name, id)?;
            if let Some(prev) = entries.last() {
                if prev.sibling_cmp(&entry) != Ordering::Less {
                    return Err(Error::MalformedTree(format!(
                        "entry {:?} out of order after {:?}",
                        entry.name, prev.name
                    )));
                }
            }
            if !names.insert(entry.name.clone()) {
                return Err(Error::MalformedTree(format!(
                    "duplicate entry {:?}",
                    entry.name
                )));
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }
}
