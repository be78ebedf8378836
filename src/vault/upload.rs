use bytes::BytesMut;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};

use std::sync::Arc;

use super::{Vault, VaultError};
use crate::blob_store::BlobStore;
use crate::hash::{ContentHash, HashingReader};
use crate::storage::models::FileRecord;
use crate::storage::Database;

const READ_CHUNK: usize = 64 * 1024;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

impl Vault {
    /// Store `source` for `owner_id`, writing the blob only if its hash is new.
    pub async fn upload<R>(
        &self,
        owner_id: &str,
        filename: &str,
        content_type: &str,
        source: R,
    ) -> Result<FileRecord, VaultError>
    where
        R: AsyncRead + Send + Unpin,
    {
        if owner_id.trim().is_empty() {
            return Err(VaultError::Validation("owner id must not be empty".into()));
        }
        if filename.trim().is_empty() {
            return Err(VaultError::Validation("filename must not be empty".into()));
        }
        let content_type = match content_type.trim() {
            "" => DEFAULT_CONTENT_TYPE,
            ct => ct,
        };

        // First pass: hash while buffering. The buffer is the rewindable copy
        // the blob write reads from.
        let (hash, data) = self.buffer_and_hash(source).await?;
        let byte_size = data.len() as u64;

        let record = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            content_hash: hash,
            byte_size,
            content_type: content_type.to_string(),
            created_at: Utc::now(),
        };

        let db = self.db.clone();
        let blobs = Arc::clone(&self.blobs);
        let locks = Arc::clone(&self.locks);

        let (record, wrote_blob) = tokio::spawn(async move {
            let _lock = locks.lock(&record.content_hash).await;
            let wrote_blob = store_record(&db, blobs.as_ref(), &record, data).await?;
            Ok::<_, VaultError>((record, wrote_blob))
        })
        .await??;

        tracing::debug!(
            file_id = %record.id,
            owner_id = %owner_id,
            hash = %record.content_hash,
            bytes = byte_size,
            deduplicated = !wrote_blob,
            "Stored file"
        );
        Ok(record)
    }

    async fn buffer_and_hash<R>(&self, source: R) -> Result<(ContentHash, BytesMut), VaultError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let limit = self.max_upload_size;
        // One byte past the limit is enough to tell an oversized upload apart.
        let mut reader = HashingReader::new(source.take(limit.saturating_add(1)));
        let mut data = BytesMut::new();

        loop {
            data.reserve(READ_CHUNK);
            let n = reader
                .read_buf(&mut data)
                .await
                .map_err(VaultError::Source)?;
            if n == 0 {
                break;
            }
            if data.len() as u64 > limit {
                return Err(VaultError::TooLarge { limit });
            }
        }

        let (hash, _) = reader.finish();
        Ok((hash, data))
    }
}

/// Write the blob unless it is already stored, then insert `record`.
/// Caller holds the lock for the record's hash. Returns whether a blob was written.
async fn store_record(
    db: &Database,
    blobs: &dyn BlobStore,
    record: &FileRecord,
    data: BytesMut,
) -> Result<bool, VaultError> {
    let hash = &record.content_hash;

    let wrote_blob = if blobs.exists(hash).await? {
        tracing::debug!(hash = %hash, "Content already stored, skipping blob write");
        false
    } else {
        blobs
            .write(hash, Box::pin(std::io::Cursor::new(data.freeze())))
            .await?;
        true
    };

    if let Err(e) = db.put_file(record) {
        // Nothing can reference a blob we just created, so drop it rather
        // than leave it for the sweep.
        if wrote_blob && matches!(db.count_references(hash, None), Ok(0)) {
            if let Err(cleanup) = blobs.delete(hash).await {
                tracing::warn!(hash = %hash, error = %cleanup, "Failed to remove unreferenced blob");
            }
        }
        return Err(e.into());
    }

    Ok(wrote_blob)
}
