//! Alert sinks (blocking playback backends)

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::AlertError;

/// What is being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// Drowsiness alarm below the escalation limit
    DrowsinessAlarm { alarm_count: u32 },
    /// Final alarm; emergency stop started
    EmergencyStarted,
}

/// A single beep: (frequency Hz, duration ms)
pub type Tone = (u32, u32);

const ALARM_TONES: &[Tone] = &[(1000, 500), (800, 500), (1000, 500)];
const EMERGENCY_TONES: &[Tone] = &[(1000, 500), (800, 500), (1000, 500), (800, 500), (1000, 500)];

impl AlertKind {
    /// Beep pattern for this alert
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            Self::DrowsinessAlarm { .. } => ALARM_TONES,
            Self::EmergencyStarted => EMERGENCY_TONES,
        }
    }
}

/// Blocking alert output. Implementations run on a blocking worker thread.
pub trait AlertSink: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn play(&self, kind: AlertKind) -> Result<(), AlertError>;
}

/// Audio backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundBackend {
    /// Pick the platform player
    #[default]
    Auto,
    /// macOS `afplay`
    Afplay,
    /// SoX `play` synthesizer
    Sox,
    /// Windows console beep through PowerShell
    PowerShell,
    /// Terminal bell only
    Bell,
}

impl SoundBackend {
    /// Resolve `Auto` for the current platform
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "macos") => Self::Afplay,
            Self::Auto if cfg!(target_os = "windows") => Self::PowerShell,
            Self::Auto => Self::Sox,
            other => other,
        }
    }
}

/// Plays alerts through an external system command
pub struct SystemSound {
    backend: SoundBackend,
}

impl SystemSound {
    pub fn new(backend: SoundBackend) -> Self {
        Self {
            backend: backend.resolve(),
        }
    }

    pub fn backend(&self) -> SoundBackend {
        self.backend
    }

    fn run(mut command: Command) -> Result<(), AlertError> {
        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(AlertError::Playback(format!("player exited with {}", status)))
        }
    }
}

impl AlertSink for SystemSound {
    fn name(&self) -> &'static str {
        "system-sound"
    }

    fn play(&self, kind: AlertKind) -> Result<(), AlertError> {
        debug!("Playing {:?} via {:?}", kind, self.backend);
        match self.backend {
            SoundBackend::Afplay => {
                let mut command = Command::new("afplay");
                command.arg("/System/Library/Sounds/Funk.aiff");
                Self::run(command)
            }
            SoundBackend::Sox => {
                for &(freq, ms) in kind.tones() {
                    let mut command = Command::new("play");
                    command
                        .args(["-q", "-n", "synth"])
                        .arg(format!("{:.3}", ms as f64 / 1000.0))
                        .arg("sin")
                        .arg(freq.to_string());
                    Self::run(command)?;
                }
                Ok(())
            }
            SoundBackend::PowerShell => {
                let script = kind
                    .tones()
                    .iter()
                    .map(|(freq, ms)| format!("[console]::beep({},{})", freq, ms))
                    .collect::<Vec<_>>()
                    .join(";");
                let mut command = Command::new("powershell");
                command.args(["-NoProfile", "-Command", &script]);
                Self::run(command)
            }
            SoundBackend::Bell | SoundBackend::Auto => TerminalBell.play(kind),
        }
    }
}

/// Terminal bell on stderr; used when no audio backend works
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn name(&self) -> &'static str {
        "terminal-bell"
    }

    fn play(&self, kind: AlertKind) -> Result<(), AlertError> {
        let bells = "\x07".repeat(kind.tones().len());
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(bells.as_bytes())?;
        stderr.flush()?;
        Ok(())
    }
}
