//! Moving between a directory on disk and tree objects in the store

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::object::{FileMode, Object, ObjectId, ObjectKind, RawObject, Tree, TreeEntry};
use crate::storage::ObjectStore;

/// Store the tree for `dir`, bottom-up, and return its id.
///
/// Entries named `skip` (the repository's own storage directory) are left
/// out at every level, as are subdirectories with nothing to record.
pub fn write_tree<S: ObjectStore>(storage: &S, dir: &Path, skip: &str) -> Result<ObjectId> {
    let tree = build_tree(storage, dir, skip)?;
    storage.put_object(&Object::Tree(tree).to_raw())
}

fn build_tree<S: ObjectStore>(storage: &S, dir: &Path, skip: &str) -> Result<Tree> {
    let mut entries = Vec::new();

    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name().into_string().map_err(|name| {
            Error::MalformedTree(format!("file name is not valid UTF-8: {:?}", name))
        })?;
        if name == skip {
            continue;
        }

        let path = dir_entry.path();
        let file_type = dir_entry.file_type()?;

        let (mode, id) = if file_type.is_dir() {
            let subtree = build_tree(storage, &path, skip)?;
            if subtree.is_empty() {
                tracing::debug!("skipping empty directory {}", path.display());
                continue;
            }
            let id = storage.put_object(&Object::Tree(subtree).to_raw())?;
            (FileMode::Directory, id)
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            let id = put_blob(storage, target.as_os_str().as_encoded_bytes().to_vec())?;
            (FileMode::Symlink, id)
        } else if file_type.is_file() {
            let mode = if is_executable(&dir_entry.metadata()?) {
                FileMode::Executable
            } else {
                FileMode::Regular
            };
            (mode, put_blob(storage, fs::read(&path)?)?)
        } else {
            tracing::warn!("skipping special file {}", path.display());
            continue;
        };

        entries.push(TreeEntry::new(mode, name, id)?);
    }

    Ok(Tree::new(entries))
}

fn put_blob<S: ObjectStore>(storage: &S, data: Vec<u8>) -> Result<ObjectId> {
    storage.put_object(&RawObject::new(ObjectKind::Blob, data))
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

/// Read a tree object, failing if `id` names something else
pub fn read_tree<S: ObjectStore>(storage: &S, id: &ObjectId) -> Result<Tree> {
    let raw = storage.get_object(id)?;
    if raw.kind != ObjectKind::Tree {
        return Err(Error::MalformedTree(format!("{} is a {}, not a tree", id, raw.kind)));
    }
    Tree::decode(&raw.data)
}

fn read_blob<S: ObjectStore>(storage: &S, id: &ObjectId) -> Result<Vec<u8>> {
    let raw = storage.get_object(id)?;
    if raw.kind != ObjectKind::Blob {
        return Err(Error::MalformedObject(format!("{} is a {}, not a blob", id, raw.kind)));
    }
    Ok(raw.data)
}

/// Write the contents of a stored tree into `dest`, returning the number of
/// files created.
pub fn checkout_tree<S: ObjectStore>(
    storage: &S,
    tree_id: &ObjectId,
    dest: &Path,
    skip: &str,
) -> Result<usize> {
    let tree = read_tree(storage, tree_id)?;
    refuse_symlink(dest)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for entry in tree.entries() {
        if entry.name() == skip {
            tracing::warn!("refusing to check out {} entry", skip);
            continue;
        }
        let path = dest.join(entry.name());
        refuse_symlink(&path)?;

        match entry.mode() {
            FileMode::Directory => {
                written += checkout_tree(storage, entry.id(), &path, skip)?;
            }
            FileMode::Submodule => {
                tracing::warn!("skipping submodule {} at {}", entry.name(), entry.id());
            }
            FileMode::Symlink => {
                let target = read_blob(storage, entry.id())?;
                write_symlink(&target, &path)?;
                written += 1;
            }
            FileMode::Regular | FileMode::Executable => {
                fs::write(&path, read_blob(storage, entry.id())?)?;
                if entry.mode() == FileMode::Executable {
                    set_executable(&path)?;
                }
                written += 1;
            }
        }
    }

    Ok(written)
}

/// Checkout never creates, descends into or writes through an existing symlink
fn refuse_symlink(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => Err(Error::MalformedTree(format!(
            "refusing to write through symlink {}",
            path.display()
        ))),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn write_symlink(target: &[u8], path: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(OsStr::from_bytes(target), path)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(target: &[u8], path: &Path) -> Result<()> {
    fs::write(path, target)?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::{FilesystemStorage, StorageBackend};

    fn setup() -> (TempDir, FilesystemStorage) {
        let temp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(temp.path().join(".git"), Compression::default());
        storage.initialize("main").unwrap();
        (temp, storage)
    }

    #[test]
    fn test_write_tree_matches_git() {
        let (temp, storage) = setup();
        let root = temp.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/inner.txt"), "inner\n").unwrap();
        fs::write(root.join("a.txt"), "top\n").unwrap();
        fs::write(root.join("b"), "hello\n").unwrap();

        let id = write_tree(&storage, root, ".git").unwrap();
        assert_eq!(id.to_string(), "a3df15e5ccf39e37a0f4be5e21435fff3c474ad8");

        let tree = read_tree(&storage, &id).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a.txt", "a", "b"]);
        assert!(tree.entries().iter().all(|e| e.name() != ".git"));

        // Subtree and blobs were stored too
        let sub = ObjectId::from_hex("108aabee1ecf7ab27858b9b94edb90863ce0f006").unwrap();
        assert!(storage.exists(&sub).unwrap());
        let inner = ObjectId::from_hex("f05648e753bc95da97c2b753903c1111061d67af").unwrap();
        assert_eq!(read_blob(&storage, &inner).unwrap(), b"inner\n");
    }

    #[test]
    fn test_write_tree_skips_empty_directories() {
        let (temp, storage) = setup();
        fs::create_dir_all(temp.path().join("empty/nested")).unwrap();

        let id = write_tree(&storage, temp.path(), ".git").unwrap();
        assert_eq!(id.to_string(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_tree_modes() {
        use std::os::unix::fs::PermissionsExt;

        let (temp, storage) = setup();
        let script = temp.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", temp.path().join("link")).unwrap();

        let id = write_tree(&storage, temp.path(), ".git").unwrap();
        let tree = read_tree(&storage, &id).unwrap();
        let modes: Vec<_> = tree.entries().iter().map(|e| (e.name(), e.mode())).collect();
        assert_eq!(
            modes,
            vec![("link", FileMode::Symlink), ("run.sh", FileMode::Executable)]
        );
        assert_eq!(read_blob(&storage, tree.entries()[0].id()).unwrap(), b"run.sh");
    }

    #[test]
    fn test_checkout_roundtrip() {
        let (src, storage) = setup();
        fs::create_dir_all(src.path().join("docs/deep")).unwrap();
        fs::write(src.path().join("docs/deep/notes.md"), "# notes\n").unwrap();
        fs::write(src.path().join("README"), "readme\n").unwrap();
        let id = write_tree(&storage, src.path(), ".git").unwrap();

        let dest = TempDir::new().unwrap();
        let written = checkout_tree(&storage, &id, dest.path(), ".git").unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("docs/deep/notes.md")).unwrap(),
            "# notes\n"
        );
        assert_eq!(fs::read_to_string(dest.path().join("README")).unwrap(), "readme\n");

        // Writing the checked-out copy gives the same tree back
        let copy = FilesystemStorage::new(dest.path().join(".git"), Compression::default());
        copy.initialize("main").unwrap();
        assert_eq!(write_tree(&copy, dest.path(), ".git").unwrap(), id);
    }

    #[cfg(unix)]
    #[test]
    fn test_checkout_symlink_then_directory_stays_inside() {
        let (_temp, storage) = setup();
        let outside = TempDir::new().unwrap();
        let target = outside.path().to_str().unwrap().as_bytes().to_vec();

        let payload = put_blob(&storage, b"pwned\n".to_vec()).unwrap();
        let inner = Tree::new(vec![
            TreeEntry::new(FileMode::Regular, "pwn".to_string(), payload).unwrap()
        ]);
        let inner = storage.put_object(&Object::Tree(inner).to_raw()).unwrap();
        let link = put_blob(&storage, target).unwrap();
        let hostile = Tree::new(vec![
            TreeEntry::new(FileMode::Symlink, "a".to_string(), link).unwrap(),
            TreeEntry::new(FileMode::Directory, "a".to_string(), inner).unwrap(),
        ]);
        let hostile = storage.put_object(&Object::Tree(hostile).to_raw()).unwrap();

        let dest = TempDir::new().unwrap();
        let err = checkout_tree(&storage, &hostile, dest.path(), ".git").unwrap_err();
        assert!(matches!(err, Error::MalformedTree(_)), "{:?}", err);
        assert!(!outside.path().join("pwn").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_checkout_refuses_existing_symlink() {
        let (src, storage) = setup();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub/file"), "data\n").unwrap();
        fs::write(src.path().join("top"), "top\n").unwrap();
        let id = write_tree(&storage, src.path(), ".git").unwrap();

        let outside = TempDir::new().unwrap();
        for name in ["sub", "top"] {
            let dest = TempDir::new().unwrap();
            std::os::unix::fs::symlink(outside.path(), dest.path().join(name)).unwrap();
            assert!(checkout_tree(&storage, &id, dest.path(), ".git").is_err());
        }
        assert!(fs::read_dir(outside.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_read_tree_rejects_blob() {
        let (_temp, storage) = setup();
        let id = put_blob(&storage, b"not a tree".to_vec()).unwrap();
        assert!(matches!(read_tree(&storage, &id), Err(Error::MalformedTree(_))));
    }
}
