use std::sync::Arc;

use super::{Vault, VaultError};
use crate::blob_store::BlobStore;
use crate::hash::ContentHash;
use crate::storage::Database;

impl Vault {
    /// Delete one file record, removing its blob if no other record shares it.
    ///
    /// Ownership must already be verified by the caller; `owner_id` is only
    /// recorded in logs. Once started, the delete runs to completion even if
    /// the returned future is dropped.
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), VaultError> {
        let hash = self
            .db
            .get_file(id)?
            .ok_or(VaultError::NotFound)?
            .content_hash;

        let db = self.db.clone();
        let blobs = Arc::clone(&self.blobs);
        let locks = Arc::clone(&self.locks);
        let file_id = id.to_string();

        tokio::spawn(async move {
            let _lock = locks.lock(&hash).await;
            remove_reference(&db, blobs.as_ref(), &hash, &file_id).await
        })
        .await??;

        tracing::debug!(file_id = %id, owner_id = %owner_id, "Deleted file");
        Ok(())
    }
}

/// Drop record `id` and, if it was the last reference, the blob behind it.
/// Caller holds the lock for `hash`.
async fn remove_reference(
    db: &Database,
    blobs: &dyn BlobStore,
    hash: &ContentHash,
    id: &str,
) -> Result<(), VaultError> {
    // A concurrent delete of the same record may have won the lock first.
    if db.get_file(id)?.is_none() {
        return Err(VaultError::NotFound);
    }

    let remaining = db.count_references(hash, Some(id))?;
    if remaining == 0 {
        // Blob goes first: if this fails the record stays and still resolves.
        blobs.delete(hash).await?;
        tracing::debug!(hash = %hash, "Removed last reference, deleted blob");
    } else {
        tracing::debug!(hash = %hash, remaining, "Blob still referenced, keeping it");
    }

    db.delete_file(id)?;
    Ok(())
}
