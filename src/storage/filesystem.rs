use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use tempfile::NamedTempFile;

use super::compression;
use super::traits::{ObjectStore, RefStore, StorageBackend};
use crate::error::{Error, Result};
use crate::object::{hash_canonical, ObjectId};

/// Loose-object store rooted at a repository's git directory
///
/// Objects live at `objects/<2 hex>/<38 hex>` as zlib-compressed canonical
/// bytes; refs are plain-text files under `refs/`.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    git_dir: PathBuf,
    compression: Compression,
}

impl FilesystemStorage {
    pub fn new<P: AsRef<Path>>(git_dir: P, compression: Compression) -> Self {
        FilesystemStorage {
            git_dir: git_dir.as_ref().to_path_buf(),
            compression,
        }
    }

    fn objects_dir(&self) -> PathBuf {
        self.git_dir.join("objects")
    }

    /// Shard path for an object id
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.shard();
        self.objects_dir().join(dir).join(file)
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        let valid = name.starts_with("refs/")
            && name
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..");
        if !valid {
            return Err(Error::InvalidRefName(name.to_string()));
        }
        Ok(self.git_dir.join(name))
    }

    /// Move a finished object file into place without replacing one that a
    /// concurrent writer of the same object got there first with.
    fn persist_object(temp: NamedTempFile, path: &Path) -> Result<()> {
        match temp.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("{} written concurrently", path.display());
                Ok(())
            }
            Err(e) => Err(Error::Io(e.error)),
        }
    }

    /// Write `content` to `path` through a temp file in the same directory.
    fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::Io(std::io::Error::other("path has no parent")))?;
        fs::create_dir_all(dir)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(content)?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl ObjectStore for FilesystemStorage {
    fn put(&self, canonical: &[u8]) -> Result<ObjectId> {
        let id = hash_canonical(canonical);
        let path = self.object_path(&id);

        // Same key means same bytes, so an existing file is already correct.
        if path.exists() {
            tracing::debug!("object {} already stored", id);
            return Ok(id);
        }

        let compressed = compression::compress(canonical, self.compression)?;
        let dir = path
            .parent()
            .ok_or_else(|| Error::Io(std::io::Error::other("object path has no parent")))?;
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&compressed)?;
        Self::persist_object(temp, &path)?;

        tracing::debug!("stored object {} ({} bytes)", id, canonical.len());
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        compression::decompress(&compressed).map_err(|e| Error::CorruptObject {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.object_path(id).is_file())
    }
}

impl RefStore for FilesystemStorage {
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let path = self.ref_path(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(ObjectId::from_hex(content.trim())?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_ref(&self, name: &str, id: &ObjectId) -> Result<()> {
        let path = self.ref_path(name)?;
        Self::write_atomic(&path, format!("{}\n", id).as_bytes())?;
        tracing::debug!("updated {} -> {}", name, id);
        Ok(())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        let target = format!("refs/heads/{}", branch);
        self.ref_path(&target)?;
        Self::write_atomic(
            &self.git_dir.join("HEAD"),
            format!("ref: {}\n", target).as_bytes(),
        )
    }

    fn read_head(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.git_dir.join("HEAD")) {
            Ok(content) => Ok(content
                .trim()
                .strip_prefix("ref: ")
                .map(|target| target.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl StorageBackend for FilesystemStorage {
    fn initialize(&self, default_branch: &str) -> Result<()> {
        fs::create_dir_all(self.objects_dir())?;
        fs::create_dir_all(self.git_dir.join("refs").join("heads"))?;
        if !self.git_dir.join("HEAD").exists() {
            self.set_head(default_branch)?;
        }
        Ok(())
    }
}
