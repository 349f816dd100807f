use anyhow::{Context, Result};
use std::io::Write;

use super::resolve_revision;
use crate::object::Tree;
use crate::storage::StorageBackend;
use crate::worktree;

/// Handle the ls-tree command
pub fn handle<S: StorageBackend, W: Write>(
    storage: &S,
    output: &mut W,
    rev: &str,
    name_only: bool,
) -> Result<()> {
    let id = resolve_revision(storage, rev)?;
    let tree =
        worktree::read_tree(storage, &id).with_context(|| format!("Failed to read tree {}", id))?;

    write_entries(&tree, output, name_only)
}

/// One line per entry in stored order: either the bare name, or
/// `<mode> <type> <hash>\t<name>` with the mode zero-padded to six digits
pub fn write_entries<W: Write>(tree: &Tree, output: &mut W, name_only: bool) -> Result<()> {
    for entry in tree.entries() {
        if name_only {
            writeln!(output, "{}", entry.name())?;
        } else {
            writeln!(
                output,
                "{:0>6} {} {}\t{}",
                entry.mode().as_octal(),
                entry.mode().object_kind(),
                entry.id(),
                entry.name()
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use std::fs;
    use tempfile::TempDir;

    use super::*;
    use crate::object::ObjectId;
    use crate::storage::FilesystemStorage;

    fn fixture() -> (TempDir, FilesystemStorage, ObjectId) {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        storage.initialize("main").unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/inner.txt"), "inner\n").unwrap();
        fs::write(temp.path().join("a.txt"), "top\n").unwrap();
        fs::write(temp.path().join("b"), "hello\n").unwrap();
        let id = worktree::write_tree(&storage, temp.path(), ".git").unwrap();
        (temp, storage, id)
    }

    #[test]
    fn test_name_only() {
        let (_temp, storage, id) = fixture();
        let mut output = Vec::new();
        handle(&storage, &mut output, &id.to_hex(), true).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "a.txt\na\nb\n");
    }

    #[test]
    fn test_long_form() {
        let (_temp, storage, id) = fixture();
        let mut output = Vec::new();
        handle(&storage, &mut output, &id.to_hex(), false).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "100644 blob bf1a1fdefa3c7f4b0180a75a951e9574662a8bc8\ta.txt\n\
             040000 tree 108aabee1ecf7ab27858b9b94edb90863ce0f006\ta\n\
             100644 blob ce013625030ba8dba906f756967f9e9ca394464a\tb\n"
        );
    }

    #[test]
    fn test_not_a_tree() {
        let (_temp, storage, _id) = fixture();
        let blob = "ce013625030ba8dba906f756967f9e9ca394464a";
        assert!(handle(&storage, &mut Vec::new(), blob, true).is_err());
        assert!(handle(&storage, &mut Vec::new(), "nothex", true).is_err());
    }
}
