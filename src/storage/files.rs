use redb::{ReadableTable, TableDefinition, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{FileFilter, FileRecord};
use super::tables::*;
use crate::hash::ContentHash;

type IndexTable = TableDefinition<'static, &'static str, &'static [u8]>;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and add it to the owner and reference indexes
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(!file.owner_id.is_empty(), "owner id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;
        }
        index_add(&write_txn, OWNER_FILES, &file.owner_id, &file.id)?;
        index_add(&write_txn, HASH_FILES, file.content_hash.as_str(), &file.id)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by its UUID
    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get a file only if it belongs to `owner_id`. Foreign files look absent.
    pub fn get_file_for_owner(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        Ok(self.get_file(id)?.filter(|f| f.owner_id == owner_id))
    }

    /// Delete a file by its UUID and clean up the owner and reference indexes
    pub fn delete_file(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<FileRecord> = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let deleted = match existing {
            Some(file) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }
                index_remove(&write_txn, OWNER_FILES, &file.owner_id, id)?;
                index_remove(&write_txn, HASH_FILES, file.content_hash.as_str(), id)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Number of records referencing `hash`, not counting `excluding` if given.
    pub fn count_references(
        &self,
        hash: &ContentHash,
        excluding: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(HASH_FILES)?;

        let ids: Vec<String> = match table.get(hash.as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(0),
        };

        let count = ids
            .iter()
            .filter(|id| Some(id.as_str()) != excluding)
            .count();
        Ok(count as u64)
    }

    /// Get all files (admin and consistency checks)
    pub fn get_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }

    /// List an owner's files matching `filter`, newest first
    pub fn list_files(
        &self,
        owner_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let file_ids: Vec<String> = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                if filter.matches(&file) {
                    files.push(file);
                }
            }
        }

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }
}

fn index_add(
    write_txn: &WriteTransaction,
    definition: IndexTable,
    key: &str,
    file_id: &str,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(definition)?;
    let mut file_ids: Vec<String> = match table.get(key)? {
        Some(data) => rmp_serde::from_slice(data.value())?,
        None => Vec::new(),
    };

    if !file_ids.iter().any(|id| id == file_id) {
        file_ids.push(file_id.to_string());
        let data = rmp_serde::to_vec_named(&file_ids)?;
        table.insert(key, data.as_slice())?;
    }
    Ok(())
}

fn index_remove(
    write_txn: &WriteTransaction,
    definition: IndexTable,
    key: &str,
    file_id: &str,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(definition)?;
    let file_ids: Option<Vec<String>> = match table.get(key)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };

    if let Some(mut ids) = file_ids {
        ids.retain(|id| id != file_id);
        if ids.is_empty() {
            table.remove(key)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            table.insert(key, data.as_slice())?;
        }
    }
    Ok(())
}
