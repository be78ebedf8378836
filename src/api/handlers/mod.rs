mod admin;
mod files;

pub use admin::{admin_purge, health, sweep};
pub use files::{delete_file, download_file, get_file, list_files, upload_file};
pub use files::{FileResponse, ListFilesParams};
