//! `rodio`-backed media element for files on the local disk.
//!
//! Commands are applied to a `Sink` right away; outcomes (metadata, progress,
//! completion, failures) are queued and handed to the controller by
//! [`LocalMedia::poll`].

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::media::{MediaElement, MediaPlaybackError, MediaSignal};

pub struct LocalMedia {
    path: PathBuf,
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    volume: f64,
    playing: bool,
    finished: bool,
    last_position: Option<Duration>,
    pending: VecDeque<MediaSignal>,
}

impl LocalMedia {
    /// Opens `path` paused at the start. Failures are reported through
    /// [`LocalMedia::poll`] rather than returned.
    pub fn open(path: &Path) -> Self {
        let mut media = Self {
            path: path.to_path_buf(),
            stream: None,
            sink: None,
            volume: 1.0,
            playing: false,
            finished: false,
            last_position: None,
            pending: VecDeque::new(),
        };

        match media.load() {
            Ok(duration) => {
                let duration = duration.map_or(f64::NAN, |d| d.as_secs_f64());
                media.pending.push_back(MediaSignal::MetadataLoaded { duration });
            }
            Err(e) => media.fail(e),
        }
        media
    }

    fn load(&mut self) -> Result<Option<Duration>, MediaPlaybackError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| MediaPlaybackError::Output(e.to_string()))?;
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_ref() else {
            return Err(MediaPlaybackError::Output("output stream closed".into()));
        };

        let file = File::open(&self.path)
            .map_err(|e| MediaPlaybackError::Open(format!("{}: {e}", self.path.display())))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| MediaPlaybackError::Decode(e.to_string()))?;
        let duration = source.total_duration();

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        sink.pause();
        sink.set_volume(self.volume as f32);

        self.sink = Some(sink);
        self.finished = false;
        self.last_position = None;
        debug!("loaded {}", self.path.display());
        Ok(duration)
    }

    fn fail(&mut self, err: MediaPlaybackError) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.playing = false;
        self.pending.push_back(MediaSignal::Error(err));
    }

    /// Drains queued signals and samples the sink for progress and completion.
    pub fn poll(&mut self) -> Vec<MediaSignal> {
        if let Some(sink) = self.sink.as_ref() {
            if self.playing && !self.finished {
                if sink.empty() {
                    self.finished = true;
                    self.playing = false;
                    self.pending.push_back(MediaSignal::Ended);
                } else {
                    let position = sink.get_pos();
                    if self.last_position != Some(position) {
                        self.last_position = Some(position);
                        self.pending.push_back(MediaSignal::TimeUpdate {
                            position: position.as_secs_f64(),
                        });
                    }
                }
            }
        }
        self.pending.drain(..).collect()
    }
}

impl MediaElement for LocalMedia {
    fn play(&mut self) {
        if self.finished {
            if let Err(e) = self.load() {
                self.fail(e);
                return;
            }
        }
        if let Some(sink) = self.sink.as_ref() {
            sink.play();
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        self.playing = false;
    }

    fn set_position(&mut self, seconds: f64) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if let Err(e) = sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            warn!("seek in {} failed: {e}", self.path.display());
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.volume as f32);
        }
    }
}
