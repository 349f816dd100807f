use crate::error::Result;
use crate::object::{ObjectId, RawObject};

/// Immutable, content-addressed object storage
pub trait ObjectStore {
    /// Hash, compress and store canonical object bytes.
    /// Storing bytes that are already present is a no-op returning the same id.
    fn put(&self, canonical: &[u8]) -> Result<ObjectId>;

    /// Read back the canonical bytes stored under `id`.
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>>;

    fn exists(&self, id: &ObjectId) -> Result<bool>;

    fn put_object(&self, object: &RawObject) -> Result<ObjectId> {
        self.put(&object.to_canonical())
    }

    fn get_object(&self, id: &ObjectId) -> Result<RawObject> {
        RawObject::from_canonical(&self.get(id)?)
    }
}

/// Plain-text ref pointers (`HEAD`, `refs/heads/*`)
pub trait RefStore {
    /// Resolve a ref such as `refs/heads/main`; `None` if it does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>>;

    fn write_ref(&self, name: &str, id: &ObjectId) -> Result<()>;

    /// Point `HEAD` at `refs/heads/<branch>`.
    fn set_head(&self, branch: &str) -> Result<()>;

    /// The ref `HEAD` points to, e.g. `refs/heads/main`.
    fn read_head(&self) -> Result<Option<String>>;
}

/// Combined storage backend trait
pub trait StorageBackend: ObjectStore + RefStore {
    /// Create the on-disk layout if it does not exist yet.
    fn initialize(&self, default_branch: &str) -> Result<()>;
}
