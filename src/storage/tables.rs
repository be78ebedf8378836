use redb::TableDefinition;

/// File records: uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Owner index: owner_id -> msgpack Vec of file UUIDs
pub const OWNER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_files");

/// Reference index: content hash -> msgpack Vec of file UUIDs sharing that blob
pub const HASH_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("hash_files");
