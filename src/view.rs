//! Catalog page state: the loaded tracks, the filter selection and the load
//! status, plus wiring of the visible tracks into the playback registry.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    domain::track::Track,
    filter::{self, FilterSelection},
    playback::{MediaElement, PlaybackRegistry},
    storage::error::CatalogLoadError,
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load tracks. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub struct CatalogView {
    tracks: Vec<Track>,
    selection: FilterSelection,
    load_state: LoadState,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            selection: FilterSelection::default(),
            load_state: LoadState::Loading,
        }
    }
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) {
        self.load_state = LoadState::Loading;
    }

    /// Installs the outcome of a catalog fetch. A failure leaves an empty
    /// catalog and a single user-facing message.
    pub fn finish_load(&mut self, result: Result<Vec<Track>, CatalogLoadError>) {
        match result {
            Ok(tracks) => {
                debug!("catalog loaded with {} tracks", tracks.len());
                self.tracks = tracks;
                self.load_state = LoadState::Ready;
            }
            Err(e) => {
                warn!("catalog load failed: {e}");
                self.tracks.clear();
                self.load_state = LoadState::Failed(LOAD_FAILED_MESSAGE.to_string());
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.load_state {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn select_genre(&mut self, genre: &str) {
        if !self.is_loading() {
            self.selection.select_genre(genre);
        }
    }

    pub fn select_tag(&mut self, tag: &str) {
        if !self.is_loading() {
            self.selection.select_tag(tag);
        }
    }

    pub fn clear_filters(&mut self) {
        if !self.is_loading() {
            self.selection.clear();
        }
    }

    pub fn visible(&self) -> Vec<&Track> {
        if self.is_loading() {
            return Vec::new();
        }
        filter::visible_tracks(&self.tracks, &self.selection)
    }

    /// Genre choices to render, or `None` when there is nothing to choose.
    pub fn genre_controls(&self) -> Option<Vec<String>> {
        self.controls(filter::genre_vocabulary(&self.tracks))
    }

    pub fn tag_controls(&self) -> Option<Vec<String>> {
        self.controls(filter::tag_vocabulary(&self.tracks))
    }

    fn controls(&self, vocabulary: Vec<String>) -> Option<Vec<String>> {
        (!self.is_loading() && filter::is_selectable(&vocabulary)).then_some(vocabulary)
    }

    /// Mounts a controller for each visible track and drops the rest.
    pub fn reconcile_players<M, F>(&self, registry: &mut PlaybackRegistry<M>, open_media: F)
    where
        M: MediaElement,
        F: FnMut(&Track) -> M,
    {
        let (created, discarded) = registry.reconcile(self.visible(), open_media);
        if created + discarded > 0 {
            debug!("players: {created} mounted, {discarded} dropped");
        }
    }
}
