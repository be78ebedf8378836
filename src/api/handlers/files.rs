use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::api::OwnerId;
use crate::storage::models::{FileFilter, FileRecord};
use crate::vault::VaultError;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub byte_size: u64,
    pub content_hash: String,
    pub content_type: String,
    pub created_at: String,
    pub filename: String,
    pub id: String,
    pub owner_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub uploaded_after: Option<NaiveDate>,
    #[serde(default)]
    pub uploaded_before: Option<NaiveDate>,
    #[serde(default)]
    pub size_min: Option<u64>,
    #[serde(default)]
    pub size_max: Option<u64>,
}

fn default_limit() -> u32 {
    20
}

impl ListFilesParams {
    fn filter(&self) -> FileFilter {
        FileFilter {
            filename: self.filename.clone().filter(|s| !s.is_empty()),
            content_type: self.content_type.clone().filter(|s| !s.is_empty()),
            uploaded_after: self.uploaded_after,
            uploaded_before: self.uploaded_before,
            size_min: self.size_min,
            size_max: self.size_max,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<FileResponse>>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some("file") {
            // Ignore unknown fields
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        // Claimed type from the part headers; fall back to the filename extension
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .filter(|ct| ct != "application/octet-stream")
            .or_else(|| mime_guess::from_path(&filename).first().map(|m| m.to_string()))
            .unwrap_or_default();

        // The vault's bounded buffer is the only copy of the body.
        let source = Box::pin(StreamReader::new(field.map_err(std::io::Error::other)));

        let record = state
            .vault
            .upload(owner.as_str(), &filename, &content_type, source)
            .await
            .map_err(upload_error)?;

        return Ok((StatusCode::CREATED, JSend::success(file_to_response(&record))));
    }

    Err(ApiError::bad_request("file field is required"))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let file = state.vault.find(owner.as_str(), &id)?;
    Ok(JSend::success(file_to_response(&file)))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state.vault.download(owner.as_str(), &id).await?;

    let body = Body::from_stream(ReaderStream::new(download.reader));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        download
            .content_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(download.byte_size),
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&download.filename)
    );
    if let Ok(value) = disposition.parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    // Ownership check lives here; the vault trusts its caller.
    state.vault.find(owner.as_str(), &id)?;
    state.vault.delete(owner.as_str(), &id).await?;
    Ok(JSend::success(()))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let files = state.vault.list(owner.as_str(), &params.filter())?;
    let total = files.len() as u64;
    let items: Vec<FileResponse> = files
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(file_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        byte_size: file.byte_size,
        content_hash: file.content_hash.to_string(),
        content_type: file.content_type.clone(),
        created_at: file.created_at.to_rfc3339(),
        filename: file.filename.clone(),
        id: file.id.clone(),
        owner_id: file.owner_id.clone(),
    }
}

/// Body-limit breaches report 413 like the vault's own size check.
fn multipart_error(e: &MultipartError) -> ApiError {
    let status = e.status();
    let message = format!("Invalid multipart data: {}", e.body_text());
    if status.is_server_error() {
        ApiError::Error(status, message)
    } else {
        ApiError::Fail(status, message)
    }
}

/// Multipart failures reach the vault as source read errors; unwrap them again.
fn upload_error(e: VaultError) -> ApiError {
    if let VaultError::Source(ref io) = e {
        if let Some(multipart) = io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return multipart_error(multipart);
        }
    }
    e.into()
}

/// Keep the user-supplied name from breaking out of the quoted header value.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
