pub mod cat_file;
pub mod clone;
pub mod commit_tree;
pub mod hash_object;
pub mod init;
pub mod ls_tree;
pub mod unpack_objects;
pub mod write_tree;

use anyhow::{Context, Result};

use crate::object::ObjectId;
use crate::storage::RefStore;

/// Resolve a full hex id, `HEAD`, a `refs/...` name or a branch name
pub(crate) fn resolve_revision<S: RefStore>(storage: &S, rev: &str) -> Result<ObjectId> {
    if let Ok(id) = ObjectId::from_hex(rev) {
        return Ok(id);
    }

    let refname = if rev == "HEAD" {
        storage
            .read_head()?
            .context("HEAD is not a symbolic ref")?
    } else if rev.starts_with("refs/") {
        rev.to_string()
    } else {
        format!("refs/heads/{}", rev)
    };

    storage
        .read_ref(&refname)
        .with_context(|| format!("Failed to read {}", refname))?
        .with_context(|| format!("Not a valid object name {}", rev))
}
