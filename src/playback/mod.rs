//! Per-track playback.
//!
//! A [`PlaybackController`] drives one media element through the transport
//! state machine. The host owns the decoding primitive and reports back via
//! [`MediaSignal`]s; the [`PlaybackRegistry`] keeps one controller per visible
//! track and drops signals for tracks that have left the view.

mod controller;
pub mod local;
mod media;
mod registry;
mod sources;
mod time;

pub use controller::*;
pub use media::*;
pub use registry::*;
pub use sources::*;
pub use time::*;

#[cfg(test)]
pub(crate) use controller::tests as controller_tests;
