use log::{debug, warn};
use serde::Serialize;

use super::media::{MediaElement, MediaPlaybackError, MediaSignal};
use super::sources::{SourceCandidate, fallback_sources};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Ready,
    Playing,
    Paused,
    /// Finished; the playhead is back at 0 and play starts over.
    Ended,
    /// Terminal. Only the fallback transport is left.
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub current_time: f64,
    /// `None` until metadata arrives, or forever for unbounded streams.
    pub duration: Option<f64>,
    pub volume: f64,
    pub muted: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            duration: None,
            volume: 1.0,
            muted: false,
        }
    }
}

/// What the host should render for this track.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSurface {
    Custom,
    Fallback(Vec<SourceCandidate>),
}

/// Transport state machine for one track.
pub struct PlaybackController<M: MediaElement> {
    media: M,
    source: String,
    state: PlaybackState,
    /// Volume restored when unmuting.
    audible_volume: f64,
    error: Option<MediaPlaybackError>,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(source: impl Into<String>, media: M) -> Self {
        Self {
            media,
            source: source.into(),
            state: PlaybackState::default(),
            audible_volume: 1.0,
            error: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn error(&self) -> Option<&MediaPlaybackError> {
        self.error.as_ref()
    }

    fn is_errored(&self) -> bool {
        self.state.status == PlaybackStatus::Errored
    }

    pub fn toggle_play(&mut self) {
        match self.state.status {
            PlaybackStatus::Errored => {}
            PlaybackStatus::Playing => {
                self.media.pause();
                self.state.status = PlaybackStatus::Paused;
            }
            _ => {
                self.media.play();
                self.state.status = PlaybackStatus::Playing;
            }
        }
    }

    /// Seeks to the point clicked on a progress bar `total_width` wide.
    pub fn seek(&mut self, offset: f64, total_width: f64) {
        if self.is_errored() || !offset.is_finite() || !total_width.is_finite() {
            return;
        }
        let Some(duration) = self.state.duration else {
            return;
        };
        if total_width <= 0.0 {
            return;
        }

        let new_time = offset.clamp(0.0, total_width) / total_width * duration;
        self.media.set_position(new_time);
        self.state.current_time = new_time;
    }

    pub fn set_volume(&mut self, volume: f64) {
        if self.is_errored() || !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(volume);
        self.state.volume = volume;
        self.state.muted = volume == 0.0;
        if volume > 0.0 {
            self.audible_volume = volume;
        }
    }

    pub fn toggle_mute(&mut self) {
        if self.is_errored() {
            return;
        }
        if self.state.muted {
            let volume = self.audible_volume;
            self.media.set_volume(volume);
            self.state.volume = volume;
            self.state.muted = false;
        } else {
            if self.state.volume > 0.0 {
                self.audible_volume = self.state.volume;
            }
            self.media.set_volume(0.0);
            self.state.muted = true;
        }
    }

    /// Volume actually reaching the output.
    pub fn effective_volume(&self) -> f64 {
        if self.state.muted {
            0.0
        } else {
            self.state.volume
        }
    }

    /// Fraction of the track already played, for drawing the progress bar.
    pub fn progress(&self) -> f64 {
        match self.state.duration {
            Some(d) if d > 0.0 => self.state.current_time / d,
            _ => 0.0,
        }
    }

    pub fn handle_signal(&mut self, signal: MediaSignal) {
        if self.is_errored() {
            debug!("ignoring {signal:?} for errored source {}", self.source);
            return;
        }

        match signal {
            MediaSignal::MetadataLoaded { duration } => {
                self.state.duration = (duration.is_finite() && duration >= 0.0).then_some(duration);
                if let Some(d) = self.state.duration {
                    self.state.current_time = self.state.current_time.min(d);
                }
                if self.state.status == PlaybackStatus::Idle {
                    self.state.status = PlaybackStatus::Ready;
                }
            }
            MediaSignal::TimeUpdate { position } => {
                if !position.is_finite() {
                    return;
                }
                let position = position.max(0.0);
                self.state.current_time = match self.state.duration {
                    Some(d) => position.min(d),
                    None => position,
                };
            }
            MediaSignal::Ended => {
                self.state.status = PlaybackStatus::Ended;
                self.state.current_time = 0.0;
            }
            MediaSignal::Error(err) => {
                warn!("playback of {} failed, switching to fallback: {err}", self.source);
                self.state.status = PlaybackStatus::Errored;
                self.error = Some(err);
            }
        }
    }

    pub fn surface(&self) -> TransportSurface {
        match self.fallback_sources() {
            Some(sources) => TransportSurface::Fallback(sources),
            None => TransportSurface::Custom,
        }
    }

    /// Source candidates for the fallback player, once custom transport has
    /// given up.
    pub fn fallback_sources(&self) -> Option<Vec<SourceCandidate>> {
        self.is_errored().then(|| fallback_sources(&self.source))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Play,
        Pause,
        Position(f64),
        Volume(f64),
    }

    #[derive(Debug, Default)]
    pub(crate) struct MockMedia {
        pub calls: Vec<Call>,
    }

    impl MediaElement for MockMedia {
        fn play(&mut self) {
            self.calls.push(Call::Play);
        }
        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }
        fn set_position(&mut self, seconds: f64) {
            self.calls.push(Call::Position(seconds));
        }
        fn set_volume(&mut self, volume: f64) {
            self.calls.push(Call::Volume(volume));
        }
    }

    fn loaded(duration: f64) -> PlaybackController<MockMedia> {
        let mut c = PlaybackController::new("/assets/audio/a.ogg", MockMedia::default());
        c.handle_signal(MediaSignal::MetadataLoaded { duration });
        c
    }

    #[test]
    fn metadata_moves_idle_to_ready() {
        let mut c = PlaybackController::new("a.mp3", MockMedia::default());
        assert_eq!(c.status(), PlaybackStatus::Idle);

        c.handle_signal(MediaSignal::MetadataLoaded { duration: 120.0 });

        assert_eq!(c.status(), PlaybackStatus::Ready);
        assert_eq!(c.state().duration, Some(120.0));
    }

    #[test]
    fn unbounded_duration_stays_unknown() {
        let c = loaded(f64::INFINITY);
        assert_eq!(c.state().duration, None);
        assert_eq!(c.progress(), 0.0);
    }

    #[test]
    fn toggle_play_alternates_playing_and_paused() {
        let mut c = loaded(60.0);

        c.toggle_play();
        assert_eq!(c.status(), PlaybackStatus::Playing);
        c.toggle_play();
        assert_eq!(c.status(), PlaybackStatus::Paused);
        c.toggle_play();
        assert_eq!(c.status(), PlaybackStatus::Playing);

        assert_eq!(c.media().calls, vec![Call::Play, Call::Pause, Call::Play]);
    }

    #[test]
    fn play_requested_before_metadata_stays_playing() {
        let mut c = PlaybackController::new("a.mp3", MockMedia::default());
        c.toggle_play();
        c.handle_signal(MediaSignal::MetadataLoaded { duration: 10.0 });
        assert_eq!(c.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn ended_resets_time_and_can_replay() {
        let mut c = loaded(60.0);
        c.toggle_play();
        c.handle_signal(MediaSignal::TimeUpdate { position: 59.5 });

        c.handle_signal(MediaSignal::Ended);
        assert_eq!(c.status(), PlaybackStatus::Ended);
        assert_eq!(c.state().current_time, 0.0);

        c.toggle_play();
        assert_eq!(c.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn seek_maps_offset_to_time() {
        let mut c = loaded(200.0);

        c.seek(50.0, 200.0);
        assert_eq!(c.state().current_time, 50.0);
        assert_eq!(c.media().calls.last(), Some(&Call::Position(50.0)));
        assert_eq!(c.progress(), 0.25);

        c.seek(500.0, 200.0);
        assert_eq!(c.state().current_time, 200.0);
    }

    #[test]
    fn seek_without_duration_is_ignored() {
        let mut c = PlaybackController::new("a.mp3", MockMedia::default());
        c.seek(10.0, 100.0);
        assert_eq!(c.state().current_time, 0.0);
        assert!(c.media().calls.is_empty());

        let mut c = loaded(100.0);
        c.seek(10.0, 0.0);
        assert!(c.media().calls.is_empty());
    }

    #[test]
    fn time_update_never_exceeds_duration() {
        let mut c = loaded(30.0);
        c.handle_signal(MediaSignal::TimeUpdate { position: 31.2 });
        assert_eq!(c.state().current_time, 30.0);
    }

    #[test]
    fn volume_zero_means_muted() {
        let mut c = loaded(30.0);

        c.set_volume(0.0);
        assert!(c.state().muted);

        c.set_volume(1.7);
        assert_eq!(c.state().volume, 1.0);
        assert!(!c.state().muted);
    }

    #[test]
    fn toggle_mute_restores_previous_volume() {
        let mut c = loaded(30.0);
        c.set_volume(0.4);

        c.toggle_mute();
        assert!(c.state().muted);
        assert_eq!(c.effective_volume(), 0.0);
        assert_eq!(c.media().calls.last(), Some(&Call::Volume(0.0)));

        c.toggle_mute();
        assert!(!c.state().muted);
        assert_eq!(c.state().volume, 0.4);
        assert_eq!(c.media().calls.last(), Some(&Call::Volume(0.4)));
    }

    #[test]
    fn unmute_after_slider_to_zero_uses_last_audible_volume() {
        let mut c = loaded(30.0);
        c.set_volume(0.6);
        c.set_volume(0.0);

        c.toggle_mute();

        assert!(!c.state().muted);
        assert_eq!(c.state().volume, 0.6);
    }

    #[test]
    fn error_is_terminal_and_offers_fallback() {
        let mut c = loaded(30.0);
        c.toggle_play();

        c.handle_signal(MediaSignal::Error(MediaPlaybackError::Decode("bad frame".into())));
        assert_eq!(c.status(), PlaybackStatus::Errored);

        let calls_before = c.media().calls.len();
        c.toggle_play();
        c.seek(5.0, 10.0);
        c.set_volume(0.2);
        c.toggle_mute();
        c.handle_signal(MediaSignal::MetadataLoaded { duration: 99.0 });
        c.handle_signal(MediaSignal::Ended);

        assert_eq!(c.status(), PlaybackStatus::Errored);
        assert_eq!(c.media().calls.len(), calls_before);
        assert_eq!(c.state().duration, Some(30.0));

        match c.surface() {
            TransportSurface::Fallback(sources) => {
                assert_eq!(sources[0].mime, "audio/ogg");
                assert_eq!(sources.len(), 3);
            }
            TransportSurface::Custom => panic!("expected fallback surface"),
        }
    }

    #[test]
    fn healthy_controller_renders_custom_surface() {
        let c = loaded(30.0);
        assert_eq!(c.surface(), TransportSurface::Custom);
        assert!(c.fallback_sources().is_none());
    }
}
