use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{BlobReader, BlobStore, BlobStoreError};
use crate::hash::{ContentHash, HashingReader};

const TEMP_PREFIX: &str = ".incoming-";

/// Local filesystem blob store.
///
/// Layout under the root directory:
/// - `uploads/<first two hex chars>/<hash>`: committed blobs
/// - `tmp/`: in-flight writes, renamed into `uploads/` once complete
pub struct LocalBlobStore {
    blobs_dir: PathBuf,
    temp_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref();
        let blobs_dir = root.join("uploads");
        let temp_dir = root.join("tmp");
        std::fs::create_dir_all(&blobs_dir)?;
        std::fs::create_dir_all(&temp_dir)?;

        let store = Self {
            blobs_dir,
            temp_dir,
        };
        let removed = store.remove_stale_temp_files()?;
        if removed > 0 {
            tracing::info!(removed, "Removed interrupted blob writes");
        }
        Ok(store)
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.as_str();
        self.blobs_dir.join(&hex[..2]).join(hex)
    }

    /// Leftovers from writes interrupted by a crash. Nothing else writes here.
    fn remove_stale_temp_files(&self) -> Result<usize, std::io::Error> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.temp_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, hash: &ContentHash) -> Result<bool, BlobStoreError> {
        Ok(tokio::fs::try_exists(self.blob_path(hash)).await?)
    }

    async fn write(&self, hash: &ContentHash, source: BlobReader) -> Result<u64, BlobStoreError> {
        let path = self.blob_path(hash);
        if tokio::fs::try_exists(&path).await? {
            return Ok(0);
        }

        // The temp path unlinks itself on drop, so any early return below
        // (including cancellation of this future) leaves no partial blob.
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.temp_dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut reader = HashingReader::new(source);
        tokio::io::copy(&mut reader, &mut file).await?;
        file.sync_all().await?;
        drop(file);

        let (actual, written) = reader.finish();
        if actual != *hash {
            return Err(BlobStoreError::DigestMismatch {
                expected: hash.clone(),
                actual,
            });
        }

        if let Some(shard) = path.parent() {
            tokio::fs::create_dir_all(shard).await?;
        }
        temp_path.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(hash = %hash, bytes = written, "Committed blob");
        Ok(written)
    }

    async fn open(&self, hash: &ContentHash) -> Result<BlobReader, BlobStoreError> {
        match tokio::fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobStoreError::NotFound(hash.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<(), BlobStoreError> {
        match tokio::fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ContentHash>, BlobStoreError> {
        let mut hashes = Vec::new();
        let mut shards = tokio::fs::read_dir(&self.blobs_dir).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if let Ok(hash) = entry.file_name().to_string_lossy().parse::<ContentHash>() {
                    hashes.push(hash);
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}
