use std::{collections::HashSet, path::Path};

use log::debug;

use crate::{
    domain::track::{Track, TrackId},
    storage::error::CatalogLoadError,
};

/// Reads a bundled `tracks.json` catalog. Entries without an id get their
/// position in the list, or the next free number if another entry already
/// claims it.
pub fn fetch_static_catalog(path: &Path) -> Result<Vec<Track>, CatalogLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Missing {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tracks: Vec<Track> =
        serde_json::from_str(&raw).map_err(|source| CatalogLoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    assign_missing_ids(&mut tracks);

    debug!("read {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

fn assign_missing_ids(tracks: &mut [Track]) {
    let mut taken: HashSet<String> = tracks
        .iter()
        .filter(|t| !t.id.is_empty())
        .map(|t| t.id.as_str().to_string())
        .collect();

    let mut candidate = 0usize;
    for (index, track) in tracks.iter_mut().enumerate() {
        if !track.id.is_empty() {
            continue;
        }
        candidate = candidate.max(index);
        while taken.contains(&candidate.to_string()) {
            candidate += 1;
        }
        let id = candidate.to_string();
        taken.insert(id.clone());
        track.id = TrackId::new(id);
    }
}
