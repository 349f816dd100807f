use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::storage::ObjectStore;
use crate::worktree;

/// Handle the write-tree command
/// Snapshots `workdir` (minus the git directory) and prints the root tree id
pub fn handle<S: ObjectStore, W: Write>(
    storage: &S,
    config: &Config,
    output: &mut W,
    workdir: &Path,
) -> Result<()> {
    let id = worktree::write_tree(storage, workdir, &config.git_dir)
        .with_context(|| format!("Failed to write tree for {:?}", workdir))?;

    tracing::info!("wrote tree {} for {:?}", id, workdir);
    writeln!(output, "{}", id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use std::fs;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::{FilesystemStorage, StorageBackend};

    #[test]
    fn test_write_tree_output() {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        storage.initialize("main").unwrap();
        fs::write(temp.path().join("b"), "hello\n").unwrap();

        let mut output = Vec::new();
        handle(&storage, &Config::default(), &mut output, temp.path()).unwrap();

        // `git write-tree` for a single file `b` containing "hello\n"
        assert_eq!(output, b"f09792be40f18f537c28b624b7bc7771f25082e1\n");
    }

    #[test]
    fn test_custom_git_dir_is_skipped() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            git_dir: ".minigit".to_string(),
            ..Config::default()
        };
        let storage = FilesystemStorage::new(temp.path().join(".minigit"), Compression::default());
        storage.initialize("main").unwrap();

        let mut output = Vec::new();
        handle(&storage, &config, &mut output, temp.path()).unwrap();
        assert_eq!(output, b"4b825dc642cb6eb9a060e54bf8d69288fbee4904\n");
    }
}
