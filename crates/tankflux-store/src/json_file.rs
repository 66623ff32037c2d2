use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::DocumentBackend;
use crate::document::Document;
use crate::errors::StoreError;

/// A store persisted as a single JSON document.
///
/// The file is only touched inside each operation: reads load and drop it, writes load,
/// mutate and replace it through a sibling temporary file. A missing file reads as an empty
/// store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentBackend for JsonFileStore {
    fn load(&self) -> Result<Cow<'_, Document>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file absent, treating as empty");
                return Ok(Cow::Owned(Document::new()));
            }
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        let document: Document = serde_json::from_slice(&bytes)?;
        Ok(Cow::Owned(document))
    }

    fn save(&mut self, document: Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
            }
        }

        let bytes = serde_json::to_vec_pretty(&document)?;
        let temp = self.temp_path();
        fs::write(&temp, &bytes).map_err(|err| StoreError::io(&temp, err))?;
        fs::rename(&temp, &self.path).map_err(|err| StoreError::io(&self.path, err))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "store file written");
        Ok(())
    }
}
