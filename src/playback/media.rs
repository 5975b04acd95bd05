use thiserror::Error;

/// Decode or network failure on a single track. Never leaves the controller
/// it happened in.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaPlaybackError {
    #[error("could not open source {0}")]
    Open(String),

    #[error("could not decode source: {0}")]
    Decode(String),

    #[error("no audio output available: {0}")]
    Output(String),
}

/// Host-side decoding primitive. Commands are requests; the outcome comes
/// back later as [`MediaSignal`]s.
pub trait MediaElement {
    fn play(&mut self);
    fn pause(&mut self);
    /// Moves the playhead, in seconds.
    fn set_position(&mut self, seconds: f64);
    /// Sets the output gain in `[0, 1]`.
    fn set_volume(&mut self, volume: f64);
}

/// Events a media element reports to its controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    /// Duration in seconds. Non-finite for streams of unknown length.
    MetadataLoaded { duration: f64 },
    TimeUpdate { position: f64 },
    Ended,
    Error(MediaPlaybackError),
}
