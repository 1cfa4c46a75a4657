//! Loading: a [`Table`] to processed blob bytes.

use crate::error::{Result, ResultExt as _};
use crate::store::BlobStore;
use crate::table::{Table, csv_io};

/// Writes CSV blobs to the processed store.
#[derive(Debug)]
pub struct DataLoader<S> {
    store: S,
}

impl<S: BlobStore> DataLoader<S> {
    pub fn new(store: S) -> Self {
        tracing::debug!("DataLoader initialized for {}", store.location());
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serialize `table` and write it as `name`, overwriting any existing blob.
    /// Returns the written blob's location, e.g. `dir:/data/processed/sales.csv`.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn load_csv(&mut self, table: &Table, name: &str) -> Result<String> {
        let location = format!("{}/{name}", self.store.location());
        tracing::info!("Loading {} rows to {location}", table.row_count());
        let bytes = csv_io::serialize(table)?;
        self.store
            .write(name, &bytes)
            .with_context(|| format!("Failed to load {location}"))?;
        tracing::info!("Loaded {} bytes to {location}", bytes.len());
        Ok(location)
    }
}
