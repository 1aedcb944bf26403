//! SQL schema for the Stele SQLite store.
//!
//! Executed at connection startup. `PRAGMA user_version` gates future
//! migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The three resource tables mirror the three logical collections of the
/// repository protocol. Documents live in `doc` as JSON text with encoded
/// keys; the columns alongside exist for filtering and uniqueness only.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Primary collection: the current authoritative state, one row per id.
CREATE TABLE IF NOT EXISTS resources (
    id           TEXT PRIMARY KEY,
    owner_group  TEXT NOT NULL,
    timestamp    TEXT NOT NULL,   -- RFC 3339 UTC, millisecond precision
    doc          TEXT NOT NULL    -- JSON document, keys encoded
);

-- Version collection: one immutable snapshot per successful write.
-- Rows are only ever inserted, or removed when the parent resource is
-- deleted (cascade handled by the repository protocol).
CREATE TABLE IF NOT EXISTS resource_versions (
    id         TEXT NOT NULL,
    timestamp  TEXT NOT NULL,
    doc        TEXT NOT NULL
);

-- Metadata collection: the append-only audit trail, one row per id.
CREATE TABLE IF NOT EXISTS resource_metadata (
    id        TEXT PRIMARY KEY,
    versions  TEXT NOT NULL      -- JSON array of version entries
);

CREATE TABLE IF NOT EXISTS users (
    id   TEXT PRIMARY KEY,
    doc  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS resources_group_idx     ON resources(owner_group);
CREATE INDEX IF NOT EXISTS resources_timestamp_idx ON resources(timestamp);
CREATE INDEX IF NOT EXISTS resource_versions_id_idx ON resource_versions(id);

PRAGMA user_version = 1;
";
