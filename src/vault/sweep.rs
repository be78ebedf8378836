use super::{Vault, VaultError};

/// Outcome of an orphan sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: u64,
    pub removed: u64,
}

impl Vault {
    /// Delete blobs that no record references.
    ///
    /// Orphans appear when the process dies between a blob write and the
    /// record insert, or after an admin purge.
    pub async fn sweep_orphans(&self) -> Result<SweepStats, VaultError> {
        let mut stats = SweepStats::default();

        for hash in self.blobs.list().await? {
            stats.scanned += 1;
            let _lock = self.locks.lock(&hash).await;
            if self.db.count_references(&hash, None)? == 0 {
                self.blobs.delete(&hash).await?;
                stats.removed += 1;
                tracing::debug!(hash = %hash, "Swept orphaned blob");
            }
        }

        if stats.removed > 0 {
            tracing::info!(
                scanned = stats.scanned,
                removed = stats.removed,
                "Orphan sweep complete"
            );
        }
        Ok(stats)
    }
}
