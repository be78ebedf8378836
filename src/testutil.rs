//! Shared test helpers for file-vault unit tests.

use std::sync::Arc;

use crate::blob_store::LocalBlobStore;
use crate::config::{Config, NodeConfig, StorageConfig};
use crate::storage::Database;
use crate::vault::Vault;
use crate::AppState;

/// Create a test AppState with a temporary database and local blob store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let blobs_dir = temp_dir.path().join("blobs");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            blob_storage_path: blobs_dir.to_string_lossy().to_string(),
            sweep_on_startup: false,
        },
        test_mode: true,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let blobs = LocalBlobStore::new(&blobs_dir).expect("Failed to create test blob store");
    let vault = Vault::new(db.clone(), Arc::new(blobs), config.max_upload_size);

    Arc::new(AppState { config, db, vault })
}
