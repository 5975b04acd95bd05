use std::collections::HashMap;

use log::debug;

use crate::domain::track::{Track, TrackId};

use super::controller::PlaybackController;
use super::media::{MediaElement, MediaSignal};

/// One controller per rendered track, keyed by track id.
///
/// Controllers are created when a track becomes visible and dropped when it
/// leaves the view. A dropped controller is gone for good: late signals for
/// its id are discarded instead of being applied to a fresh instance.
pub struct PlaybackRegistry<M: MediaElement> {
    controllers: HashMap<TrackId, PlaybackController<M>>,
}

impl<M: MediaElement> Default for PlaybackRegistry<M> {
    fn default() -> Self {
        Self {
            controllers: HashMap::new(),
        }
    }
}

impl<M: MediaElement> PlaybackRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the registry in line with `visible`. Returns how many
    /// controllers were created and discarded.
    pub fn reconcile<'a, F>(
        &mut self,
        visible: impl IntoIterator<Item = &'a Track>,
        mut open_media: F,
    ) -> (usize, usize)
    where
        F: FnMut(&Track) -> M,
    {
        let mut keep: HashMap<TrackId, PlaybackController<M>> = HashMap::new();
        let mut created = 0;

        for track in visible {
            if keep.contains_key(&track.id) {
                continue;
            }
            let controller = match self.controllers.remove(&track.id) {
                Some(existing) if existing.source() == track.url => existing,
                _ => {
                    created += 1;
                    PlaybackController::new(track.url.clone(), open_media(track))
                }
            };
            keep.insert(track.id.clone(), controller);
        }

        let discarded = self.controllers.len();
        self.controllers = keep;
        (created, discarded)
    }

    /// Routes a host signal to its controller. Returns `false` when the
    /// track is no longer mounted and the signal was dropped.
    pub fn dispatch(&mut self, id: &TrackId, signal: MediaSignal) -> bool {
        match self.controllers.get_mut(id) {
            Some(controller) => {
                controller.handle_signal(signal);
                true
            }
            None => {
                debug!("dropping {signal:?} for unmounted track {id}");
                false
            }
        }
    }

    pub fn get(&self, id: &TrackId) -> Option<&PlaybackController<M>> {
        self.controllers.get(id)
    }

    pub fn get_mut(&mut self, id: &TrackId) -> Option<&mut PlaybackController<M>> {
        self.controllers.get_mut(id)
    }

    pub fn discard(&mut self, id: &TrackId) -> bool {
        self.controllers.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
