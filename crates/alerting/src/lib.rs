//! Alerting System
//!
//! Fire-and-forget alarm playback: callers queue an alert and move on, a
//! background worker plays it through a system sound command and falls back
//! to the terminal bell when that fails.

mod dispatcher;
mod sink;

pub use dispatcher::{AlertConfig, AlertDispatcher};
pub use sink::{AlertKind, AlertSink, SoundBackend, SystemSound, TerminalBell, Tone};

use thiserror::Error;

/// Alert playback errors
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Failed to run sound player: {0}")]
    Io(#[from] std::io::Error),
}
