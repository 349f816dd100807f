use anyhow::{Context, Result};
use std::io::Write;

use crate::config::Config;
use crate::storage::StorageBackend;

/// Handle the init command
/// Creates `objects/`, `refs/heads/` and `HEAD`; an existing repository is left as is
pub fn handle<S: StorageBackend, W: Write>(
    storage: &S,
    config: &Config,
    output: &mut W,
) -> Result<()> {
    storage
        .initialize(&config.default_branch)
        .context("Failed to initialize git directory")?;

    tracing::info!("initialized repository on branch {}", config.default_branch);
    writeln!(output, "Initialized git directory")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::{FilesystemStorage, RefStore};

    #[test]
    fn test_init_layout() {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        let config = Config {
            default_branch: "trunk".to_string(),
            ..Config::default()
        };

        let mut output = Vec::new();
        handle(&storage, &config, &mut output).unwrap();

        assert_eq!(output, b"Initialized git directory\n");
        assert!(temp.path().join(".git/objects").is_dir());
        assert!(temp.path().join(".git/refs/heads").is_dir());
        assert_eq!(
            storage.read_head().unwrap().as_deref(),
            Some("refs/heads/trunk")
        );
    }

    #[test]
    fn test_init_twice_keeps_head() {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        handle(&storage, &Config::default(), &mut Vec::new()).unwrap();

        let config = Config {
            default_branch: "other".to_string(),
            ..Config::default()
        };
        handle(&storage, &config, &mut Vec::new()).unwrap();
        assert_eq!(
            storage.read_head().unwrap().as_deref(),
            Some("refs/heads/main")
        );
    }
}
