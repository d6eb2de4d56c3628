//! SQL schema for the subscription store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY
);

-- AUTOINCREMENT keeps link ids monotonic even after sweeps.
CREATE TABLE IF NOT EXISTS links (
    link_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    link_url          TEXT    NOT NULL UNIQUE,
    last_update_check TEXT    NOT NULL   -- RFC 3339 UTC, second precision
);

CREATE TABLE IF NOT EXISTS userlinks (
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    link_id INTEGER NOT NULL REFERENCES links(link_id),
    PRIMARY KEY (user_id, link_id)
);

CREATE INDEX IF NOT EXISTS userlinks_link_idx  ON userlinks(link_id);
CREATE INDEX IF NOT EXISTS links_last_check_idx ON links(last_update_check);

PRAGMA user_version = 1;
";
