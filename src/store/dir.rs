use super::BlobStore;
use crate::error::{EtlError, Result, ResultExt as _};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A bucket backed by a single directory. Blob names are plain file names; anything
/// that would resolve outside the directory is rejected.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    base_path: PathBuf,
}

impl DirBlobStore {
    /// Open an existing directory as a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::NotFound`] if `base_path` is not a directory.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        if !base_path.is_dir() {
            return Err(EtlError::NotFound(format!(
                "bucket directory {} does not exist",
                base_path.display()
            )));
        }
        Ok(Self { base_path })
    }

    /// Open a bucket, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn create(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).with_context(|| {
            format!("Failed to create bucket directory {}", base_path.display())
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(name)),
            _ => Err(EtlError::Other(format!(
                "invalid blob name '{name}': must be a plain file name"
            ))),
        }
    }
}

impl BlobStore for DirBlobStore {
    fn location(&self) -> String {
        format!("dir:{}", self.base_path.display())
    }

    fn exists(&self, name: &str) -> bool {
        self.blob_path(name).is_ok_and(|path| path.is_file())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(name)?;
        if !path.is_file() {
            return Err(EtlError::NotFound(format!(
                "{name} not found in {}",
                self.location()
            )));
        }
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(name)?;
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_path)
            .with_context(|| format!("Failed to list {}", self.base_path.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("Skipping blob with non UTF-8 name: {raw:?}"),
            }
        }
        names.sort();
        Ok(names)
    }
}
