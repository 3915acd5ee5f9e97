use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, StoredObject, Tree};

/// Content-addressed object store.
///
/// Implementations must keep objects immutable once written and must allow
/// concurrent readers; the diff layer shares one store across worker threads
/// without any locking of its own.
pub trait ObjectStore: Send + Sync {
    /// Read an object by ID.
    ///
    /// Returns `Ok(None)` if the object does not exist and `Err` if the
    /// backend failed.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its ID. Writing an existing object is a no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object. Returns `true` if it existed.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read a blob, failing with [`StoreError::NotFound`] if it is missing.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Blob::from_stored_object(stored)
    }

    /// Read a tree, failing with [`StoreError::NotFound`] if it is missing.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Tree::from_stored_object(&stored)
    }

    fn write_blob(&self, blob: &Blob) -> StoreResult<ObjectId> {
        self.write(&blob.to_stored_object())
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }
}
