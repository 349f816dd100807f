use anyhow::{Context, Result};
use std::io::Write;

use super::{ls_tree, resolve_revision};
use crate::object::{ObjectKind, Tree};
use crate::storage::StorageBackend;

/// What `cat-file` prints about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// Contents; trees are listed like `ls-tree`
    Pretty,
    Type,
    Size,
}

/// Handle the cat-file command
pub fn handle<S: StorageBackend, W: Write>(
    storage: &S,
    output: &mut W,
    rev: &str,
    mode: CatFileMode,
) -> Result<()> {
    let id = resolve_revision(storage, rev)?;
    let raw = storage
        .get_object(&id)
        .with_context(|| format!("Failed to read object {}", id))?;

    match mode {
        CatFileMode::Type => writeln!(output, "{}", raw.kind)?,
        CatFileMode::Size => writeln!(output, "{}", raw.data.len())?,
        CatFileMode::Pretty => match raw.kind {
            ObjectKind::Tree => {
                let tree = Tree::decode(&raw.data)?;
                ls_tree::write_entries(&tree, output, false)?;
            }
            ObjectKind::Blob | ObjectKind::Commit => output.write_all(&raw.data)?,
        },
    }

    Ok(())
}
