use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";
    pub const SETTINGS: &str = "settings";
    pub const USERS: &str = "users";
    pub const SESSION: &str = "session";

    pub const ALL_TABLES: &[&str] = &[TRACKS, SETTINGS, USERS, SESSION];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const GENRE: &str = "genre";
    pub const TAGS: &str = "tags";
    pub const DESCRIPTION: &str = "description";
    pub const URL: &str = "url";
    pub const COVER_ART_URL: &str = "cover_art_url";
    pub const MARKERS: &str = "markers";
    pub const CREATED_AT: &str = "created_at";

    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";

    pub const EMAIL: &str = "email";
    pub const SALT: &str = "salt";
    pub const PASSWORD_HASH: &str = "password_hash";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    genre TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    description TEXT,
    url TEXT NOT NULL,
    cover_art_url TEXT,
    markers TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    salt TEXT NOT NULL,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    email TEXT NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
