use std::borrow::Cow;

use crate::backend::DocumentBackend;
use crate::document::Document;
use crate::errors::StoreError;

/// Store that lives only for the lifetime of the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Document,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryStore {
    fn load(&self) -> Result<Cow<'_, Document>, StoreError> {
        Ok(Cow::Borrowed(&self.document))
    }

    fn save(&mut self, document: Document) -> Result<(), StoreError> {
        self.document = document;
        Ok(())
    }
}
