use std::path::PathBuf;

use chrono::Utc;
use log::info;
use rusqlite::{OptionalExtension, params};

use crate::{
    config::{self, CatalogSourceKind},
    domain::track::{NewTrack, Track, TrackId, TrackPatch, sanitize_markers},
    storage::{
        assets::{AssetKind, AssetStore},
        db::{self, SecondsSinceUnix, datetime_to_i64, i64_seconds_to_utc},
        error::{CatalogLoadError, StorageError},
        schema::{columns::*, tables::*},
        static_catalog::fetch_static_catalog,
    },
};

/// Remote content store as seen by the core.
pub trait CatalogService {
    /// Every track, newest first.
    fn list_tracks(&self) -> Result<Vec<Track>, StorageError>;
    fn create_track(&mut self, fields: NewTrack) -> Result<Track, StorageError>;
    fn update_track(&mut self, id: &TrackId, fields: TrackPatch) -> Result<Track, StorageError>;
    fn delete_track(&mut self, id: &TrackId) -> Result<(), StorageError>;
    /// Stores a binary asset and returns the URL it is served from.
    fn upload_asset(&mut self, bytes: &[u8], kind: AssetKind) -> Result<String, StorageError>;
}

/// Catalog kept in the `tracks` table, with assets on disk.
pub struct CatalogStore {
    pub(crate) db: rusqlite::Connection,
    assets: AssetStore,
}

const TRACK_COLUMNS: &str = "id, title, genre, tags, description, url, cover_art_url, markers, created_at";

type TrackRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    SecondsSinceUnix,
);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn track_from_row(row: TrackRow) -> Result<Track, StorageError> {
    let (id, title, genre, tags, description, url, cover_art_url, markers, created_at) = row;
    let markers: Vec<f64> = serde_json::from_str(&markers)?;
    Ok(Track {
        id: TrackId::new(id.to_string()),
        title,
        genre,
        tags: serde_json::from_str(&tags)?,
        description,
        url,
        cover_art_url,
        markers: sanitize_markers(markers),
        created_at: i64_seconds_to_utc(created_at)?,
    })
}

fn row_id(id: &TrackId) -> Result<i64, StorageError> {
    id.as_str()
        .parse::<i64>()
        .map_err(|_| StorageError::TrackNotFound(id.clone()))
}

impl CatalogStore {
    pub fn new(
        db_config: &config::Database,
        assets: AssetStore,
    ) -> Result<Self, StorageError> {
        Ok(Self::from_existing_conn(db::open(db_config)?, assets))
    }

    pub fn from_existing_conn(db: rusqlite::Connection, assets: AssetStore) -> Self {
        Self { db, assets }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn get_track(&self, id: &TrackId) -> Result<Track, StorageError> {
        let row = self
            .db
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM {TRACKS} WHERE {ID} = ?1"),
                params![row_id(id)?],
                read_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::TrackNotFound(id.clone()))?;
        track_from_row(row)
    }
}

impl CatalogService for CatalogStore {
    fn list_tracks(&self) -> Result<Vec<Track>, StorageError> {
        let rows = {
            let mut stmt = self.db.prepare(&format!(
                "SELECT {TRACK_COLUMNS} FROM {TRACKS} ORDER BY {CREATED_AT} DESC, {ID} DESC"
            ))?;
            stmt.query_map([], read_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter().map(track_from_row).collect()
    }

    fn create_track(&mut self, fields: NewTrack) -> Result<Track, StorageError> {
        let fields = fields.normalized()?;
        let created_at = datetime_to_i64(Utc::now());

        self.db.execute(
            &format!(
                "INSERT INTO {TRACKS} ({TITLE}, {GENRE}, {TAGS}, {DESCRIPTION}, {URL}, {COVER_ART_URL}, {MARKERS}, {CREATED_AT})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                fields.title,
                fields.genre,
                serde_json::to_string(&fields.tags)?,
                fields.description,
                fields.url,
                fields.cover_art_url,
                serde_json::to_string(&fields.markers)?,
                created_at,
            ],
        )?;

        let id = TrackId::new(self.db.last_insert_rowid().to_string());
        info!("created track {id} '{}'", fields.title);
        self.get_track(&id)
    }

    fn update_track(&mut self, id: &TrackId, fields: TrackPatch) -> Result<Track, StorageError> {
        let mut track = self.get_track(id)?;
        fields.apply(&mut track)?;

        self.db.execute(
            &format!(
                "UPDATE {TRACKS} SET {TITLE} = ?1, {GENRE} = ?2, {TAGS} = ?3, {DESCRIPTION} = ?4,
                 {URL} = ?5, {COVER_ART_URL} = ?6, {MARKERS} = ?7 WHERE {ID} = ?8"
            ),
            params![
                track.title,
                track.genre,
                serde_json::to_string(&track.tags)?,
                track.description,
                track.url,
                track.cover_art_url,
                serde_json::to_string(&track.markers)?,
                row_id(id)?,
            ],
        )?;

        info!("updated track {id}");
        Ok(track)
    }

    fn delete_track(&mut self, id: &TrackId) -> Result<(), StorageError> {
        let removed = self.db.execute(
            &format!("DELETE FROM {TRACKS} WHERE {ID} = ?1"),
            params![row_id(id)?],
        )?;
        if removed == 0 {
            return Err(StorageError::TrackNotFound(id.clone()));
        }
        info!("deleted track {id}");
        Ok(())
    }

    fn upload_asset(&mut self, bytes: &[u8], kind: AssetKind) -> Result<String, StorageError> {
        self.assets.save(bytes, &kind)
    }
}

/// The configured origin of the track list.
pub enum CatalogSource {
    Live(CatalogStore),
    Static(PathBuf),
}

impl CatalogSource {
    pub fn from_config(cfg: &config::Config) -> Result<Self, StorageError> {
        Ok(match cfg.catalog.source {
            CatalogSourceKind::Live => Self::Live(CatalogStore::new(
                &cfg.database,
                AssetStore::new(&cfg.catalog.assets_dir),
            )?),
            CatalogSourceKind::Static => Self::Static(cfg.catalog.static_path.clone()),
        })
    }

    pub fn load(&self) -> Result<Vec<Track>, CatalogLoadError> {
        match self {
            CatalogSource::Live(store) => Ok(store.list_tracks()?),
            CatalogSource::Static(path) => fetch_static_catalog(path),
        }
    }

    /// The editable catalog, when there is one.
    pub fn live_mut(&mut self) -> Option<&mut CatalogStore> {
        match self {
            CatalogSource::Live(store) => Some(store),
            CatalogSource::Static(_) => None,
        }
    }
}
