//! Opaque key/value blob store.
//!
//! The bot writes changed-file content here; the remote functions read it
//! back by key. The store is a narrow collaborator: `put` and `get`,
//! nothing else.

pub mod http;
pub mod key;
pub mod memory;

pub use http::HttpBucketStore;
pub use key::derive_key;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Blob store failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("object `{key}` not found")]
    NotFound { key: String },

    #[error("storage error for `{key}`: {status} - {message}")]
    Remote {
        key: String,
        status: u16,
        message: String,
    },
}

/// Opaque blob store: put bytes under a key, get them back.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `key`, returning the key the object is now
    /// addressable by.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Fetch the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}
