//! Terminal transport for `soundfolio play`.

use std::{
    io::BufRead,
    path::Path,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use log::debug;

use crate::{
    domain::track::Track,
    playback::{PlaybackController, PlaybackStatus, TransportSurface, format_time, local::LocalMedia},
};

const TICK: Duration = Duration::from_millis(250);

const HELP: &str = "commands: p (play/pause), s <seconds> (seek), v <0-1> (volume), m (mute), j <n> (jump to marker n), q (quit)";

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Toggle,
    Seek(f64),
    Volume(f64),
    Mute,
    Marker(usize),
    Quit,
}

pub fn parse_command(line: &str) -> Option<PlayerCommand> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let arg = parts.next();

    match (cmd, arg) {
        ("p", None) => Some(PlayerCommand::Toggle),
        ("m", None) => Some(PlayerCommand::Mute),
        ("q", None) => Some(PlayerCommand::Quit),
        ("s", Some(secs)) => secs.parse().ok().map(PlayerCommand::Seek),
        ("v", Some(vol)) => vol.parse().ok().map(PlayerCommand::Volume),
        ("j", Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(PlayerCommand::Marker),
        _ => None,
    }
}

fn status_line(controller: &PlaybackController<LocalMedia>) -> String {
    let state = controller.state();
    let duration = state.duration.map_or_else(|| "--:--".to_string(), format_time);
    format!(
        "[{:?}] {} / {}  vol {:.0}%{}",
        state.status,
        format_time(state.current_time),
        duration,
        controller.effective_volume() * 100.0,
        if state.muted { " (muted)" } else { "" }
    )
}

fn apply(
    controller: &mut PlaybackController<LocalMedia>,
    track: &Track,
    command: PlayerCommand,
) -> bool {
    match command {
        PlayerCommand::Toggle => controller.toggle_play(),
        PlayerCommand::Mute => controller.toggle_mute(),
        PlayerCommand::Volume(v) => controller.set_volume(v),
        PlayerCommand::Seek(secs) => seek_to(controller, secs),
        PlayerCommand::Marker(n) => match track.markers.get(n - 1) {
            Some(at) => seek_to(controller, *at),
            None => println!("track has {} marker(s)", track.markers.len()),
        },
        PlayerCommand::Quit => return false,
    }
    true
}

/// The progress bar is modelled as one unit per second.
fn seek_to(controller: &mut PlaybackController<LocalMedia>, secs: f64) {
    match controller.state().duration {
        Some(duration) => controller.seek(secs, duration),
        None => println!("duration unknown, cannot seek yet"),
    }
}

/// Plays `path` until the user quits or playback fails.
pub fn play(track: &Track, path: &Path) {
    println!("{} [{}]", track.title, track.genre);
    if !track.markers.is_empty() {
        let labels: Vec<_> = track.markers.iter().map(|m| format_time(*m)).collect();
        println!("markers: {}", labels.join(", "));
    }
    println!("{HELP}");

    let mut controller = PlaybackController::new(track.url.clone(), LocalMedia::open(path));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
                None => println!("{HELP}"),
            }
        }
        let _ = tx.send(PlayerCommand::Quit);
    });

    let mut last_line = String::new();
    loop {
        for signal in controller.media_mut().poll() {
            debug!("media signal: {signal:?}");
            controller.handle_signal(signal);
        }

        if let TransportSurface::Fallback(sources) = controller.surface() {
            if let Some(err) = controller.error() {
                println!("playback failed: {err}");
            }
            println!("try opening the source directly:");
            for source in sources {
                println!("  {} ({})", source.url, source.mime);
            }
            return;
        }

        let line = status_line(&controller);
        if line != last_line {
            println!("{line}");
            if controller.status() == PlaybackStatus::Ended {
                println!("finished, press p to play again");
            }
            last_line = line;
        }

        match rx.recv_timeout(TICK) {
            Ok(cmd) => {
                if !apply(&mut controller, track, cmd) {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
