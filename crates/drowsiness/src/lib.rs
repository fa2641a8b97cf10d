//! Drowsiness Escalation
//!
//! Turns per-frame face/eye observations into an escalating safety response:
//! - Closed-eye duration tracking with configurable hysteresis
//! - Alarm debounce with cooldown and an alarm-count limit
//! - Simulated emergency-stop procedure (speed decay, staged progress)
//! - Render model and shutdown report for external collaborators

pub mod alarm;
pub mod config;
pub mod controller;
pub mod emergency;
pub mod error;
pub mod status;
pub mod tracker;

pub use alarm::{AlarmController, AlarmDecision, AlarmState};
pub use config::{MonitorConfig, NoFacePolicy, PostAlarmPolicy, RecoveryPolicy, StepModel};
pub use controller::{ControlEvent, Mode, OperatorCommand, SystemController};
pub use emergency::{EmergencyProgress, EmergencyStage};
pub use error::ConfigError;
pub use status::{derive_status, DriverStatus, ModeView, RenderModel, ShutdownReport};
pub use tracker::{DrowsinessTracker, PerceptionSample, TrackerEvent, TrackerState};
