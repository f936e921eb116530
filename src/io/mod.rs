pub mod config_io;
pub mod document_io;
pub mod lock;

pub use document_io::{DEFAULT_FILE, DocumentStore, JsonStore, StoreError, discover_document};
