//! file-vault - Deduplicating file storage with a content-addressed blob store
//!
//! This crate provides upload, listing, download and deletion of user files with:
//! - Content-addressed blobs keyed by SHA-256, stored once per distinct content
//! - Reference-counted blob lifecycle serialized per content hash
//! - redb embedded database for file records (ACID, MVCC, crash-safe)
//! - REST API with multipart upload and streaming download

pub mod api;
pub mod blob_store;
pub mod config;
pub mod hash;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod vault;

use config::Config;
use storage::Database;
use vault::Vault;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub vault: Vault,
}
