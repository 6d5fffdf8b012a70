//! `SQLite` schema definitions for the key-value store.

/// Key-value pairs written by the persistence bridge.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Schema bookkeeping, separate from application keys.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Base schema, applied before migrations.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_KV_TABLE, CREATE_METADATA_TABLE];

/// Index used when listing keys by recency.
pub const CREATE_UPDATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_kv_updated_at ON kv(updated_at DESC)
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_table_columns() {
        assert!(CREATE_KV_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_KV_TABLE.contains("value TEXT NOT NULL"));
        assert!(CREATE_KV_TABLE.contains("updated_at TEXT NOT NULL"));
    }

    #[test]
    fn test_metadata_kept_apart_from_kv() {
        assert_eq!(SCHEMA_STATEMENTS.len(), 2);
        assert!(CREATE_METADATA_TABLE.contains("metadata"));
        assert!(!CREATE_METADATA_TABLE.contains(" kv "));
    }
}
