use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

pub type SecondsSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

/// Opens the configured database and makes sure every table exists.
pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = if config.in_memory {
        open_in_memory()?
    } else {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("database.path is required unless in_memory = true"))?;
        open_from_file(path)?
    };
    schema::init(&db)?;
    Ok(db)
}

pub fn datetime_to_i64(time: DateTime<Utc>) -> SecondsSinceUnix {
    time.timestamp()
}

/// converts number of seconds since unix epoch to a UTC date time
pub fn i64_seconds_to_utc(since_unix: SecondsSinceUnix) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(since_unix, 0)
        .ok_or(anyhow!("failed to convert {since_unix} s timestamp to datetime"))
}

pub fn to_local_time(time: DateTime<Utc>) -> DateTime<Local> {
    DateTime::from(time)
}
