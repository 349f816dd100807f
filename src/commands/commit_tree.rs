use anyhow::{Context, Result};
use std::io::Write;

use super::resolve_revision;
use crate::config::Config;
use crate::object::{Commit, Object, ObjectId, ObjectKind, Signature};
use crate::storage::StorageBackend;

/// Handle the commit-tree command
/// Author and committer are the configured identity, stamped with the current time
pub fn handle<S: StorageBackend, W: Write>(
    storage: &S,
    config: &Config,
    output: &mut W,
    tree: &str,
    parent: Option<&str>,
    message: &str,
) -> Result<()> {
    let signature = Signature::now_utc(config.user_name.as_str(), config.user_email.as_str());
    let id = create_commit(storage, tree, parent, message, signature)?;

    writeln!(output, "{}", id)?;
    Ok(())
}

/// Build and store a commit after checking that `tree` and `parent` exist
/// and have the right types
fn create_commit<S: StorageBackend>(
    storage: &S,
    tree: &str,
    parent: Option<&str>,
    message: &str,
    signature: Signature,
) -> Result<ObjectId> {
    let tree = resolve(storage, tree, ObjectKind::Tree)?;
    let parent = parent
        .map(|parent| resolve(storage, parent, ObjectKind::Commit))
        .transpose()?;

    let commit = Commit {
        tree,
        parent,
        author: signature.clone(),
        committer: signature,
        message: message.to_string(),
    };
    let id = storage
        .put_object(&Object::Commit(commit).to_raw())
        .context("Failed to store commit")?;

    tracing::info!("created commit {} for tree {}", id, tree);
    Ok(id)
}

fn resolve<S: StorageBackend>(storage: &S, rev: &str, expected: ObjectKind) -> Result<ObjectId> {
    let id = resolve_revision(storage, rev)?;
    let raw = storage
        .get_object(&id)
        .with_context(|| format!("Failed to read {} {}", expected, id))?;
    if raw.kind != expected {
        anyhow::bail!("{} is a {}, not a {}", id, raw.kind, expected);
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use flate2::Compression;
    use tempfile::TempDir;

    use super::*;
    use crate::object::{RawObject, Tree};
    use crate::storage::{FilesystemStorage, ObjectStore, RefStore};

    const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    fn setup() -> (TempDir, FilesystemStorage) {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        storage.initialize("main").unwrap();
        storage.put_object(&Object::Tree(Tree::new(Vec::new())).to_raw()).unwrap();
        (temp, storage)
    }

    fn jane() -> Signature {
        Signature::new(
            "Jane Doe",
            "jane@example.com",
            DateTime::parse_from_rfc3339("2023-11-14T22:13:20+00:00").unwrap(),
        )
    }

    #[test]
    fn test_matches_git() {
        let (_temp, storage) = setup();
        let id = create_commit(&storage, EMPTY_TREE, None, "Initial commit", jane()).unwrap();
        assert_eq!(id.to_string(), "674bfe16315bd801f6fa9de29853d94c81c89b91");

        let raw = storage.get_object(&id).unwrap();
        assert_eq!(raw.kind, ObjectKind::Commit);
        assert!(raw.data.ends_with(b"\n\nInitial commit\n"));
    }

    #[test]
    fn test_with_parent() {
        let (_temp, storage) = setup();
        let first = create_commit(&storage, EMPTY_TREE, None, "Initial commit", jane()).unwrap();
        let second =
            create_commit(&storage, EMPTY_TREE, Some(first.to_hex().as_str()), "Second", jane()).unwrap();

        let commit = Commit::parse(&storage.get_object(&second).unwrap().data).unwrap();
        assert_eq!(commit.parent, Some(first));
        assert_eq!(commit.message, "Second");

        // Parent given as a branch name
        storage.write_ref("refs/heads/main", &second).unwrap();
        let third = create_commit(&storage, EMPTY_TREE, Some("main"), "Third", jane()).unwrap();
        let commit = Commit::parse(&storage.get_object(&third).unwrap().data).unwrap();
        assert_eq!(commit.parent, Some(second));
    }

    #[test]
    fn test_handle_uses_config_identity() {
        let (_temp, storage) = setup();
        let config = Config {
            user_name: "Config User".to_string(),
            user_email: "config@example.com".to_string(),
            ..Config::default()
        };

        let mut output = Vec::new();
        handle(&storage, &config, &mut output, EMPTY_TREE, None, "msg").unwrap();
        let id: ObjectId = String::from_utf8(output).unwrap().trim_end().parse().unwrap();

        let commit = Commit::parse(&storage.get_object(&id).unwrap().data).unwrap();
        assert_eq!(commit.author.name, "Config User");
        assert_eq!(commit.committer.email, "config@example.com");
        assert_eq!(commit.tree.to_string(), EMPTY_TREE);
    }

    #[test]
    fn test_rejects_wrong_types() {
        let (_temp, storage) = setup();
        let blob = storage
            .put_object(&RawObject::new(ObjectKind::Blob, b"x".to_vec()))
            .unwrap();

        assert!(create_commit(&storage, &blob.to_hex(), None, "m", jane()).is_err());
        assert!(
            create_commit(&storage, EMPTY_TREE, Some(blob.to_hex().as_str()), "m", jane()).is_err()
        );
        // Parent that was never stored
        assert!(create_commit(&storage, EMPTY_TREE, Some("1".repeat(40).as_str()), "m", jane()).is_err());
    }
}
