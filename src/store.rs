//! Blob storage for raw and processed tables.
//!
//! A [`BlobStore`] is a flat bucket of named byte blobs. The pipeline reads its input
//! from one store and writes its output to another; which backend sits behind each is
//! up to the caller.
//!
//! - [`DirBlobStore`]: one directory on disk is one bucket
//! - [`MemoryBlobStore`]: an in-process map, used by tests and dry runs

mod dir;
mod memory;

pub use dir::DirBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::Result;

/// A flat namespace of named blobs.
pub trait BlobStore {
    /// Where this store lives, for log and error messages (e.g. `dir:/data/raw`).
    fn location(&self) -> String;

    /// Whether a blob with this name exists.
    fn exists(&self, name: &str) -> bool;

    /// Read a whole blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EtlError::NotFound`] if the blob does not exist, or an
    /// I/O error from the backend.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not valid for this store or the backend
    /// cannot write it.
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Names of all blobs, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backend cannot be listed.
    fn list(&self) -> Result<Vec<String>>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read(name)
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(name, bytes)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}
