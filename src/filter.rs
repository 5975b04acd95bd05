//! Genre and tag filtering over the catalog.
//!
//! Everything here is a pure function of the current track list and the
//! user's selection. Vocabularies are derived on every call so they can
//! never go stale after the catalog is edited.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::track::Track;

/// Sentinel meaning "no restriction" for either filter field.
pub const ALL: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub selected_genre: String,
    pub selected_tag: String,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            selected_genre: ALL.to_string(),
            selected_tag: ALL.to_string(),
        }
    }
}

impl FilterSelection {
    /// Assigns the genre. Selecting the active genre again changes nothing;
    /// only [`FilterSelection::clear`] deselects.
    pub fn select_genre(&mut self, genre: impl Into<String>) {
        self.selected_genre = genre.into();
    }

    pub fn select_tag(&mut self, tag: impl Into<String>) {
        self.selected_tag = tag.into();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_unrestricted(&self) -> bool {
        self.selected_genre == ALL && self.selected_tag == ALL
    }

    fn matches(&self, track: &Track) -> bool {
        (self.selected_genre == ALL || track.genre == self.selected_genre)
            && (self.selected_tag == ALL || track.has_tag(&self.selected_tag))
    }
}

/// `["All", ...]` followed by every distinct non-empty genre, first seen first.
pub fn genre_vocabulary(tracks: &[Track]) -> Vec<String> {
    vocabulary(tracks.iter().map(|t| t.genre.as_str()))
}

/// Same as [`genre_vocabulary`] but over the flattened tag lists.
pub fn tag_vocabulary(tracks: &[Track]) -> Vec<String> {
    vocabulary(tracks.iter().flat_map(|t| t.tags.iter().map(String::as_str)))
}

/// A vocabulary holding only the sentinel is not worth rendering as controls.
pub fn is_selectable(vocabulary: &[String]) -> bool {
    vocabulary.len() > 1
}

/// Tracks passing both the genre and the tag restriction, in catalog order.
pub fn visible_tracks<'a>(tracks: &'a [Track], selection: &FilterSelection) -> Vec<&'a Track> {
    if selection.is_unrestricted() {
        return tracks.iter().collect();
    }
    tracks.iter().filter(|t| selection.matches(t)).collect()
}

fn vocabulary<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = vec![ALL.to_string()];
    for value in values {
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}
