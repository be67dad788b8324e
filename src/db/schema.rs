//! SQL DDL for initializing the media library and account tables.

/// SQLite schema. Each table carries a generated `id` plus a UNIQUE natural key
/// that `Save` upserts on:
/// - `users.username`
/// - `artists.title`
/// - `albums(artist_id, title)`
/// - `songs.file_name`
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK(username <> ''),
    password TEXT NOT NULL,
    role_id INTEGER NOT NULL DEFAULT 0,
    last_login TEXT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    artist TEXT NOT NULL,
    artist_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    year INTEGER NOT NULL,
    UNIQUE(artist_id, title)
);

CREATE TABLE IF NOT EXISTS songs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    album TEXT NOT NULL,
    album_id INTEGER NOT NULL,
    artist TEXT NOT NULL,
    artist_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    track INTEGER NOT NULL,
    year INTEGER NOT NULL,
    file_name TEXT NOT NULL UNIQUE,
    file_size INTEGER NOT NULL,
    length INTEGER NOT NULL,
    last_modified INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_album_id ON songs(album_id);
"#;
