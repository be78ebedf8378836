//! Deduplicating upload, download and reference-counted deletion.
//!
//! `Vault` is the only component that writes blobs. Every step that couples a
//! reference count with a blob mutation runs under the per-hash lock, so the
//! invariant "a blob exists iff at least one record references its hash" holds
//! for every caller outside an in-flight operation.
//!
//! Critical sections that mutate both the blob store and the database run on
//! their own task, so a caller that goes away mid-request cannot stop between
//! the two halves.

mod delete;
mod download;
mod locks;
mod sweep;
mod upload;

pub use download::Download;
pub use locks::{HashLockGuard, HashLocks};
pub use sweep::SweepStats;

use std::sync::Arc;

use thiserror::Error;

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::storage::models::{FileFilter, FileRecord};
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("{0}")]
    Validation(String),
    #[error("File exceeds maximum upload size of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Failed to read upload: {0}")]
    Source(std::io::Error),
    #[error("File not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("Content missing for live file record {record_id}")]
    ConsistencyViolation { record_id: String },
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct Vault {
    db: Database,
    blobs: Arc<dyn BlobStore>,
    locks: Arc<HashLocks>,
    max_upload_size: u64,
}

impl Vault {
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>, max_upload_size: u64) -> Self {
        Self {
            db,
            blobs,
            locks: Arc::new(HashLocks::new()),
            max_upload_size,
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Owner-scoped record lookup. Foreign and missing records are both `NotFound`.
    pub fn find(&self, owner_id: &str, id: &str) -> Result<FileRecord, VaultError> {
        self.db
            .get_file_for_owner(owner_id, id)?
            .ok_or(VaultError::NotFound)
    }

    pub fn list(&self, owner_id: &str, filter: &FileFilter) -> Result<Vec<FileRecord>, VaultError> {
        Ok(self.db.list_files(owner_id, filter)?)
    }
}
