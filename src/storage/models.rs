use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// A file record stored in redb: one upload instance of a blob by one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub owner_id: String,
    /// Client-supplied name, kept as an opaque display string.
    pub filename: String,
    pub content_hash: ContentHash,
    pub byte_size: u64,
    /// Client-claimed MIME type, never interpreted.
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Listing filters. Every populated field must match.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Case-insensitive substring of the filename
    pub filename: Option<String>,
    /// Case-insensitive substring of the content type
    pub content_type: Option<String>,
    /// Uploaded on or after this day (UTC)
    pub uploaded_after: Option<NaiveDate>,
    /// Uploaded on or before this day (UTC)
    pub uploaded_before: Option<NaiveDate>,
    pub size_min: Option<u64>,
    pub size_max: Option<u64>,
}

impl FileFilter {
    pub fn matches(&self, file: &FileRecord) -> bool {
        if let Some(ref needle) = self.filename {
            if !contains_ignore_case(&file.filename, needle) {
                return false;
            }
        }
        if let Some(ref needle) = self.content_type {
            if !contains_ignore_case(&file.content_type, needle) {
                return false;
            }
        }
        if let Some(after) = self.uploaded_after {
            if file.created_at < after.and_time(NaiveTime::MIN).and_utc() {
                return false;
            }
        }
        if let Some(before) = self.uploaded_before {
            // Inclusive of the whole `before` day
            let cutoff = before
                .succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc());
            if matches!(cutoff, Some(cutoff) if file.created_at >= cutoff) {
                return false;
            }
        }
        if matches!(self.size_min, Some(min) if file.byte_size < min) {
            return false;
        }
        if matches!(self.size_max, Some(max) if file.byte_size > max) {
            return false;
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
