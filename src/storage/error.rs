use std::path::PathBuf;

use thiserror::Error;

use crate::domain::track::{TrackError, TrackId};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("invalid track: {0}")]
    InvalidTrack(#[from] TrackError),

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("malformed stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// The track list could not be obtained. Shown to the user; the view falls
/// back to an empty catalog.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("catalog file {path} could not be read: {source}")]
    Missing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("catalog service failed: {0}")]
    Service(#[from] StorageError),
}
