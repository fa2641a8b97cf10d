//! Monitor configuration
//!
//! The two field-tested variants of the monitor disagree on recovery speed,
//! no-face handling, post-alarm reset amount and the emergency step model.
//! Each of these is a named policy here. [`MonitorConfig::stepped_full_reset`]
//! is the behaviour of the `enhanced_drowsiness.py` field script (2s cooldown,
//! full reset on open eyes, six 2.5s stop steps); it is also the default.
//! [`MonitorConfig::continuous_decay`] is the other variant.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the closed-eye counter recovers when both eyes are seen open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Drop the counter straight to zero
    #[default]
    FullReset,
    /// Subtract `step` frames per open-eyes frame, floored at zero
    Decay { step: u32 },
}

/// What a frame without a detected face does to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoFacePolicy {
    /// Leave the counter untouched
    #[default]
    Freeze,
    /// Count the frame as eyes closed
    TreatAsClosed,
}

/// Where the closed-eye counter lands after an alarm fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAlarmPolicy {
    #[default]
    ResetToZero,
    ResetToHalfThreshold,
}

/// Quantization of the emergency-stop progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepModel {
    /// `steps` discrete steps of `step_seconds` each
    Stepped { steps: u32, step_seconds: f64 },
    /// A single progress bar filling over `duration_seconds`
    Continuous { duration_seconds: f64 },
}

impl Default for StepModel {
    fn default() -> Self {
        Self::Stepped {
            steps: 6,
            step_seconds: 2.5,
        }
    }
}

impl StepModel {
    /// Total wall-clock length of the procedure
    pub fn total_seconds(&self) -> f64 {
        match *self {
            Self::Stepped { steps, step_seconds } => steps as f64 * step_seconds,
            Self::Continuous { duration_seconds } => duration_seconds,
        }
    }
}

/// Escalation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds of eye closure before an alarm
    pub alarm_seconds: f64,

    /// Nominal perception rate used to convert seconds into frames
    pub frames_per_second: u32,

    /// Alarms allowed before the emergency stop begins
    pub max_alarms: u32,

    /// Minimum gap between automatic alarms (seconds)
    pub alarm_cooldown_seconds: f64,

    /// Counter increment per frame without open eyes
    pub closed_frame_increment: u32,

    pub recovery: RecoveryPolicy,
    pub no_face: NoFacePolicy,
    pub post_alarm: PostAlarmPolicy,
    pub step_model: StepModel,

    /// Simulated vehicle speed when the emergency stop starts (km/h)
    pub initial_speed: f64,

    /// Simulated deceleration (km/h per second)
    pub decay_rate: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alarm_seconds: 5.0,
            frames_per_second: 30,
            max_alarms: 3,
            alarm_cooldown_seconds: 2.0,
            closed_frame_increment: 1,
            recovery: RecoveryPolicy::FullReset,
            no_face: NoFacePolicy::Freeze,
            post_alarm: PostAlarmPolicy::ResetToZero,
            step_model: StepModel::default(),
            initial_speed: 60.0,
            decay_rate: 4.0,
        }
    }
}

impl MonitorConfig {
    /// Hard resets and a six-step stop procedure, as in `enhanced_drowsiness.py`
    pub fn stepped_full_reset() -> Self {
        Self::default()
    }

    /// Gradual recovery, half-threshold post-alarm reset and a continuous 10s stop procedure
    pub fn continuous_decay() -> Self {
        Self {
            alarm_cooldown_seconds: 1.5,
            recovery: RecoveryPolicy::Decay { step: 5 },
            no_face: NoFacePolicy::TreatAsClosed,
            post_alarm: PostAlarmPolicy::ResetToHalfThreshold,
            step_model: StepModel::Continuous {
                duration_seconds: 10.0,
            },
            ..Self::default()
        }
    }

    /// Closed frames required before an alarm may fire
    pub fn alarm_frame_threshold(&self) -> u32 {
        let frames = (self.alarm_seconds * self.frames_per_second as f64).ceil();
        if frames.is_finite() && frames >= 1.0 {
            frames.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }

    pub fn alarm_cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.alarm_cooldown_seconds).unwrap_or(Duration::ZERO)
    }

    /// Reject values the state machine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range("alarm_seconds", self.alarm_seconds, (0.1, 600.0))?;
        validate_range("frames_per_second", self.frames_per_second as f64, (1.0, 1000.0))?;
        validate_range("max_alarms", self.max_alarms as f64, (1.0, 100.0))?;
        validate_range("alarm_cooldown_seconds", self.alarm_cooldown_seconds, (0.0, 600.0))?;
        validate_range(
            "closed_frame_increment",
            self.closed_frame_increment as f64,
            (1.0, 1000.0),
        )?;

        if let RecoveryPolicy::Decay { step } = self.recovery {
            validate_range("recovery.step", step as f64, (1.0, 100_000.0))?;
        }

        match self.step_model {
            StepModel::Stepped { steps, step_seconds } => {
                validate_range("step_model.steps", steps as f64, (1.0, 100.0))?;
                validate_range("step_model.step_seconds", step_seconds, (0.1, 600.0))?;
            }
            StepModel::Continuous { duration_seconds } => {
                validate_range("step_model.duration_seconds", duration_seconds, (0.1, 3600.0))?;
            }
        }

        validate_range("initial_speed", self.initial_speed, (0.0, 400.0))?;
        validate_range("decay_rate", self.decay_rate, (0.0, 100.0))?;
        Ok(())
    }
}

fn validate_range(field: &'static str, value: f64, range: (f64, f64)) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value < range.0 || value > range.1 {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: range.0,
            max: range.1,
        })
    } else {
        Ok(())
    }
}
