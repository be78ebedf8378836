mod local;

pub use local::LocalBlobStore;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::hash::ContentHash;

/// Readable byte stream handed into and out of a blob store.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob not found: {0}")]
    NotFound(ContentHash),
    #[error("Content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
}

/// Content-addressed blob persistence.
/// Keys are content hashes; the same key always names the same bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, hash: &ContentHash) -> Result<bool, BlobStoreError>;
    /// Store `source` under `hash`. Already-present blobs are left untouched.
    /// Returns the number of bytes written (zero on a no-op).
    async fn write(&self, hash: &ContentHash, source: BlobReader) -> Result<u64, BlobStoreError>;
    async fn open(&self, hash: &ContentHash) -> Result<BlobReader, BlobStoreError>;
    /// Remove a blob. Removing an absent blob succeeds.
    async fn delete(&self, hash: &ContentHash) -> Result<(), BlobStoreError>;
    async fn list(&self) -> Result<Vec<ContentHash>, BlobStoreError>;
}
