//! SQL schema for the portal user-data store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS user_data (
    uid            TEXT PRIMARY KEY,
    preferred_name TEXT,            -- NULL reverts to the upstream name
    first_login_at TEXT,            -- RFC 3339 UTC; written once
    updated_at     TEXT NOT NULL
);

PRAGMA user_version = 1;
";
