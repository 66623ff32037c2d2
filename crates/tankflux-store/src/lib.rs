pub mod backend;
pub mod document;
pub mod errors;
pub mod json_file;
pub mod memory;
pub mod model;
pub mod table;

pub use backend::{DataStore, DocumentBackend};
pub use document::Document;
pub use errors::StoreError;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use model::{AttributeValue, Dataset, Group, Metadata, Node, StorePath};
