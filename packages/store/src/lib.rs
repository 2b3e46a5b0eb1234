pub mod batch;
pub mod blob;
pub mod collections;
pub mod config;
pub mod document;
pub mod error;
pub mod query;
pub mod repo;

mod file_store;
mod memory;
pub use file_store::FileStore;
pub use memory::MemoryStore;

pub use batch::{Batch, Precondition};
pub use blob::{BlobRef, BlobStore, Sha};
pub use config::ClubConfig;
pub use document::{to_fields, Document, Fields};
pub use error::StoreError;
pub use query::{Direction, Query};
pub use repo::{ChangeEvent, ChangeKind, DocumentChange, DocumentStore, LiveQuery, Snapshot};
