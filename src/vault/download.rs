use super::{Vault, VaultError};
use crate::blob_store::{BlobReader, BlobStoreError};

/// An opened blob plus what the caller needs to frame the response.
pub struct Download {
    pub reader: BlobReader,
    pub filename: String,
    pub content_type: String,
    pub byte_size: u64,
}

impl Vault {
    /// Open the content of an owner's file for streaming.
    pub async fn download(&self, owner_id: &str, id: &str) -> Result<Download, VaultError> {
        let record = self.find(owner_id, id)?;

        // Hold the hash lock while opening so an in-flight delete of this very
        // record cannot be observed halfway. The open handle outlives the lock.
        let reader = {
            let _lock = self.locks.lock(&record.content_hash).await;
            if self.db.get_file(id)?.is_none() {
                return Err(VaultError::NotFound);
            }

            match self.blobs.open(&record.content_hash).await {
                Ok(reader) => reader,
                Err(BlobStoreError::NotFound(hash)) => {
                    tracing::error!(
                        file_id = %id,
                        hash = %hash,
                        "Invariant breach: live file record has no blob"
                    );
                    return Err(VaultError::ConsistencyViolation {
                        record_id: id.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(Download {
            reader,
            filename: record.filename,
            content_type: record.content_type,
            byte_size: record.byte_size,
        })
    }
}
