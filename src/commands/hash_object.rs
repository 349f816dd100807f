use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::object::{ObjectKind, RawObject};
use crate::storage::ObjectStore;

/// Handle the hash-object command
/// Prints the blob id of `path`; the blob is stored only when `write` is set
pub fn handle<S: ObjectStore, W: Write>(
    storage: &S,
    output: &mut W,
    path: &Path,
    write: bool,
) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let blob = RawObject::new(ObjectKind::Blob, data);

    let id = if write {
        storage
            .put_object(&blob)
            .with_context(|| format!("Failed to store blob for {:?}", path))?
    } else {
        blob.id()
    };

    writeln!(output, "{}", id)?;
    Ok(())
}
