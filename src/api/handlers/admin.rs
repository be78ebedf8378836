use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub blobs_scanned: u64,
    pub blobs_removed: u64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub files_deleted: u64,
    pub blobs_removed: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<SweepResponse>>, ApiError> {
    let stats = state.vault.sweep_orphans().await?;
    Ok(JSend::success(SweepResponse {
        blobs_scanned: stats.scanned,
        blobs_removed: stats.removed,
    }))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    // Every blob is now unreferenced
    let swept = state.vault.sweep_orphans().await?;

    tracing::warn!(
        files = stats.files,
        blobs = swept.removed,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        files_deleted: stats.files,
        blobs_removed: swept.removed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{BlobStore, LocalBlobStore};
    use crate::hash::ContentHash;
    use crate::testutil::test_state;

    #[tokio::test]
    async fn test_purge_removes_records_and_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state
            .vault
            .upload("u1", "a.txt", "text/plain", &b"alpha"[..])
            .await
            .unwrap();
        state
            .vault
            .upload("u2", "b.txt", "text/plain", &b"alpha"[..])
            .await
            .unwrap();

        let Json(body) = admin_purge(State(state.clone())).await.unwrap();
        assert_eq!(body.data.files_deleted, 2);
        assert_eq!(body.data.blobs_removed, 1);

        let blobs = LocalBlobStore::new(dir.path().join("blobs")).unwrap();
        assert!(!blobs.exists(&ContentHash::of(b"alpha")).await.unwrap());
        assert!(state.db.get_all_files().unwrap().is_empty());
    }
}
