//! Top-level escalation state machine

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmController, AlarmDecision};
use crate::config::MonitorConfig;
use crate::emergency::{self, EmergencyProgress};
use crate::error::ConfigError;
use crate::status::{derive_status, ModeView, RenderModel, ShutdownReport};
use crate::tracker::{DrowsinessTracker, PerceptionSample};

/// Controller mode. `Normal -> Emergency` only reverts through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Emergency { started_at: Instant, completed: bool },
}

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCommand {
    Reset,
    #[serde(alias = "test_alarm")]
    ManualTestAlarm,
    Quit,
}

/// Side effects requested from collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    /// Alarm raised below the escalation limit
    AlarmFired { alarm_count: u32, manual: bool },

    /// Final alarm raised, emergency stop started
    EmergencyStarted { alarm_count: u32, manual: bool },

    /// Stop procedure finished; emitted once per emergency
    VehicleStopped { elapsed_seconds: f64 },
}

impl ControlEvent {
    /// Whether this event requests audio alarm playback
    pub fn triggers_audio(&self) -> bool {
        matches!(self, Self::AlarmFired { .. } | Self::EmergencyStarted { .. })
    }
}

/// Owns the tracker, the alarm controller and the mode
pub struct SystemController {
    config: MonitorConfig,
    threshold: u32,
    tracker: DrowsinessTracker,
    alarms: AlarmController,
    mode: Mode,
    face_present: bool,
    eyes_open: bool,
}

impl SystemController {
    /// Create a controller; the configuration is validated first
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "Creating drowsiness controller: threshold={} frames, max_alarms={}, cooldown={}s",
            config.alarm_frame_threshold(),
            config.max_alarms,
            config.alarm_cooldown_seconds
        );

        Ok(Self {
            threshold: config.alarm_frame_threshold(),
            config,
            tracker: DrowsinessTracker::new(),
            alarms: AlarmController::new(),
            mode: Mode::Normal,
            face_present: false,
            eyes_open: false,
        })
    }

    /// Process one perception sample. Ignored while in emergency mode.
    pub fn on_sample(&mut self, sample: PerceptionSample) -> Option<ControlEvent> {
        if self.is_emergency() {
            debug!("Sample ignored: emergency procedure running");
            return None;
        }

        self.face_present = sample.face_present;
        self.eyes_open = sample.eyes_open();

        let event = self.tracker.observe(&sample, &self.config);
        let decision = self
            .alarms
            .tick(event.closed_duration_frames(), sample.timestamp, &self.config);

        self.apply_decision(decision, sample.timestamp, false)
    }

    /// Advance the emergency procedure on wall-clock time
    pub fn on_tick(&mut self, now: Instant) -> Option<ControlEvent> {
        let Mode::Emergency { started_at, completed } = &mut self.mode else {
            return None;
        };

        let progress = emergency::progress(*started_at, now, &self.config);
        if progress.completed && !*completed {
            *completed = true;
            warn!(
                "Emergency stop complete after {:.1}s: vehicle stopped, contacts notified",
                progress.elapsed_seconds
            );
            return Some(ControlEvent::VehicleStopped {
                elapsed_seconds: progress.elapsed_seconds,
            });
        }

        None
    }

    /// Raise a test alarm through the regular fire path. No-op in emergency mode.
    pub fn manual_test_alarm(&mut self, now: Instant) -> Option<ControlEvent> {
        if self.is_emergency() {
            debug!("Test alarm ignored: emergency procedure running");
            return None;
        }

        let decision = self.alarms.fire(now, &self.config);
        self.apply_decision(decision, now, true)
    }

    /// Clear all tracking and alarm state and return to normal mode
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.alarms.reset();
        self.mode = Mode::Normal;
        self.face_present = false;
        self.eyes_open = false;
        info!("System reset");
    }

    /// Dispatch an operator command. `Quit` is left to the caller.
    pub fn apply_command(
        &mut self,
        command: OperatorCommand,
        now: Instant,
    ) -> Option<ControlEvent> {
        match command {
            OperatorCommand::Reset => {
                self.reset();
                None
            }
            OperatorCommand::ManualTestAlarm => self.manual_test_alarm(now),
            OperatorCommand::Quit => None,
        }
    }

    fn apply_decision(
        &mut self,
        decision: AlarmDecision,
        now: Instant,
        manual: bool,
    ) -> Option<ControlEvent> {
        match decision {
            AlarmDecision::NoOp => None,
            AlarmDecision::Fired { alarm_count } => {
                self.tracker.apply_post_alarm(self.config.post_alarm, self.threshold);
                info!(
                    "Alarm {}/{} triggered{}",
                    alarm_count,
                    self.config.max_alarms,
                    if manual { " (test)" } else { "" }
                );
                Some(ControlEvent::AlarmFired { alarm_count, manual })
            }
            AlarmDecision::Escalate { alarm_count } => {
                self.tracker.apply_post_alarm(self.config.post_alarm, self.threshold);
                self.mode = Mode::Emergency {
                    started_at: now,
                    completed: false,
                };
                warn!(
                    "Emergency mode activated after {} alarms{}: initiating safe stop",
                    alarm_count,
                    if manual { " (test)" } else { "" }
                );
                Some(ControlEvent::EmergencyStarted { alarm_count, manual })
            }
        }
    }

    /// Emergency progress at `now`, if escalated
    pub fn emergency_progress(&self, now: Instant) -> Option<EmergencyProgress> {
        match self.mode {
            Mode::Emergency { started_at, .. } => {
                Some(emergency::progress(started_at, now, &self.config))
            }
            Mode::Normal => None,
        }
    }

    /// Build the render model for `now`
    pub fn render(&self, now: Instant) -> RenderModel {
        let emergency = self.emergency_progress(now);
        let mode = match (self.mode, emergency) {
            (Mode::Emergency { completed, .. }, Some(progress)) => ModeView::Emergency {
                elapsed_seconds: progress.elapsed_seconds,
                completed,
            },
            _ => ModeView::Normal,
        };

        let closed_frames = self.tracker.closed_duration_frames();
        let status = derive_status(&mode, closed_frames, self.threshold);
        let seconds_until_alarm = (self.config.alarm_seconds
            - closed_frames as f64 / self.config.frames_per_second as f64)
            .max(0.0);

        RenderModel {
            mode,
            status,
            status_label: status.label().to_string(),
            seconds_until_alarm,
            closed_seconds: if self.is_emergency() {
                None
            } else {
                self.tracker.closed_seconds(now)
            },
            closed_duration_frames: closed_frames,
            alarm_count: self.alarms.alarm_count(),
            max_alarms: self.config.max_alarms,
            face_present: self.face_present,
            eyes_open: self.eyes_open,
            emergency,
        }
    }

    pub fn shutdown_report(&self) -> ShutdownReport {
        let (reached_emergency, emergency_completed) = match self.mode {
            Mode::Normal => (false, false),
            Mode::Emergency { completed, .. } => (true, completed),
        };

        ShutdownReport {
            total_alarms: self.alarms.alarm_count(),
            reached_emergency,
            emergency_completed,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self.mode, Mode::Emergency { .. })
    }

    pub fn alarm_count(&self) -> u32 {
        self.alarms.alarm_count()
    }

    pub fn closed_duration_frames(&self) -> u32 {
        self.tracker.closed_duration_frames()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
