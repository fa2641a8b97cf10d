//! Simulated emergency-stop procedure
//!
//! Progress is a pure function of the escalation instant and the current
//! time; nothing here is stored between ticks.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{MonitorConfig, StepModel};

/// Named stages of the safe-stop procedure, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyStage {
    HazardLights,
    ReducingSpeed,
    ScanningForSafeArea,
    MovingToShoulder,
    CompleteStop,
    VehicleStopped,
}

impl EmergencyStage {
    pub const ALL: [EmergencyStage; 6] = [
        Self::HazardLights,
        Self::ReducingSpeed,
        Self::ScanningForSafeArea,
        Self::MovingToShoulder,
        Self::CompleteStop,
        Self::VehicleStopped,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::HazardLights => "Hazard lights ON",
            Self::ReducingSpeed => "Reducing speed",
            Self::ScanningForSafeArea => "Scanning for safe area",
            Self::MovingToShoulder => "Moving to shoulder",
            Self::CompleteStop => "Complete stop",
            Self::VehicleStopped => "Vehicle STOPPED",
        }
    }
}

/// Snapshot of the procedure at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmergencyProgress {
    /// Seconds since escalation
    pub elapsed_seconds: f64,

    /// Current step index, `0..=total_steps`
    pub step: u32,

    pub total_steps: u32,

    /// Completion ratio in `[0, 1]`
    pub fraction: f64,

    /// Simulated vehicle speed (km/h), never negative
    pub simulated_speed: f64,

    pub completed: bool,
}

impl EmergencyProgress {
    pub fn percent(&self) -> u8 {
        (self.fraction.clamp(0.0, 1.0) * 100.0).floor() as u8
    }

    /// Named stages already done
    pub fn stages_completed(&self) -> usize {
        let stages = EmergencyStage::ALL.len();
        ((self.fraction.clamp(0.0, 1.0) * stages as f64).floor() as usize).min(stages)
    }

    /// Stage in progress, or the final stage once complete
    pub fn current_stage(&self) -> EmergencyStage {
        let index = self.stages_completed().min(EmergencyStage::ALL.len() - 1);
        EmergencyStage::ALL[index]
    }
}

/// Compute procedure progress at `now` for a procedure started at `started_at`
pub fn progress(started_at: Instant, now: Instant, config: &MonitorConfig) -> EmergencyProgress {
    let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
    let simulated_speed = (config.initial_speed - config.decay_rate * elapsed).max(0.0);

    let (step, total_steps, fraction, completed) = match config.step_model {
        StepModel::Stepped { steps, step_seconds } => {
            let step = if step_seconds > 0.0 {
                ((elapsed / step_seconds).floor().min(steps as f64)) as u32
            } else {
                steps
            };
            let fraction = if steps == 0 { 1.0 } else { step as f64 / steps as f64 };
            (step, steps, fraction, step >= steps)
        }
        StepModel::Continuous { duration_seconds } => {
            let fraction = if duration_seconds > 0.0 {
                (elapsed / duration_seconds).min(1.0)
            } else {
                1.0
            };
            let stages = EmergencyStage::ALL.len() as u32;
            let step = ((fraction * stages as f64).floor() as u32).min(stages);
            (step, stages, fraction, elapsed >= duration_seconds)
        }
    };

    EmergencyProgress {
        elapsed_seconds: elapsed,
        step,
        total_steps,
        fraction,
        simulated_speed,
        completed,
    }
}
