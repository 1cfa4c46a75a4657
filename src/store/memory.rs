use super::BlobStore;
use crate::error::{EtlError, Result};
use std::collections::BTreeMap;

/// Blobs kept in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    name: String,
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    /// An empty bucket called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blobs: BTreeMap::new(),
        }
    }

    /// Builder-style insert, for seeding test fixtures.
    #[must_use]
    pub fn with_blob(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.insert(name.into(), bytes.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| EtlError::NotFound(format!("{name} not found in {}", self.location())))
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if name.is_empty() {
            return Err(EtlError::Other("blob names must not be empty".to_owned()));
        }
        self.blobs.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_list() -> Result<()> {
        let mut store = MemoryBlobStore::new("raw").with_blob("b.csv", "x\n1\n");
        store.write("a.csv", b"y\n2\n")?;
        store.write("b.csv", b"x\n3\n")?;

        assert_eq!(store.list()?, vec!["a.csv", "b.csv"]);
        assert_eq!(store.read("b.csv")?, b"x\n3\n");
        assert!(store.exists("a.csv"));
        assert!(!store.exists("c.csv"));
        Ok(())
    }

    #[test]
    fn test_missing_blob() {
        let store = MemoryBlobStore::new("raw");
        let err = store.read("sales.csv").unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        assert!(err.to_string().contains("memory:raw"));
    }
}
