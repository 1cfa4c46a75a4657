//! Extraction: raw blob bytes to a [`Table`].

use crate::error::{Result, ResultExt as _};
use crate::store::BlobStore;
use crate::table::{Table, csv_io};

/// Reads CSV blobs from the raw store.
#[derive(Debug)]
pub struct DataExtractor<S> {
    store: S,
}

impl<S: BlobStore> DataExtractor<S> {
    pub fn new(store: S) -> Self {
        tracing::debug!("DataExtractor initialized for {}", store.location());
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read and parse one blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EtlError::NotFound`] if the blob does not exist, or
    /// [`crate::error::EtlError::Parse`] if it is not a well-formed table.
    pub fn extract_csv(&self, name: &str) -> Result<Table> {
        tracing::info!("Extracting {name} from {}", self.store.location());
        let bytes = self.store.read(name)?;
        let table =
            csv_io::parse(&bytes).with_context(|| format!("Failed to parse {name}"))?;
        tracing::info!(
            "Extracted {} rows x {} columns from {name}",
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    /// Names of all blobs in the raw store, sorted.
    ///
    /// # Errors
    ///
    /// Returns the store's listing error.
    pub fn list_files(&self) -> Result<Vec<String>> {
        let files = self.store.list()?;
        tracing::info!("Found {} files in {}", files.len(), self.store.location());
        Ok(files)
    }
}
