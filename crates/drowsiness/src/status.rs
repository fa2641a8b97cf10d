//! Driver status and render model

use serde::{Deserialize, Serialize};

use crate::emergency::EmergencyProgress;

/// Serializable view of the controller mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeView {
    Normal,
    Emergency { elapsed_seconds: f64, completed: bool },
}

/// Driver status shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Awake,
    StayAlert,
    DrowsyWarning,
    EmergencyStop,
    VehicleStopped,
}

impl DriverStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Awake => "AWAKE",
            Self::StayAlert => "STAY ALERT",
            Self::DrowsyWarning => "DROWSY WARNING",
            Self::EmergencyStop => "EMERGENCY STOP IN PROGRESS",
            Self::VehicleStopped => "VEHICLE STOPPED",
        }
    }
}

/// Derive the operator-facing status
pub fn derive_status(
    mode: &ModeView,
    closed_duration_frames: u32,
    alarm_frame_threshold: u32,
) -> DriverStatus {
    match *mode {
        ModeView::Emergency { completed: true, .. } => DriverStatus::VehicleStopped,
        ModeView::Emergency { completed: false, .. } => DriverStatus::EmergencyStop,
        ModeView::Normal => {
            // Bands at 70% and 30% of the threshold, in tenths
            let closed = closed_duration_frames as u64 * 10;
            let threshold = alarm_frame_threshold as u64;
            if closed > threshold * 7 {
                DriverStatus::DrowsyWarning
            } else if closed > threshold * 3 {
                DriverStatus::StayAlert
            } else {
                DriverStatus::Awake
            }
        }
    }
}

/// Everything an external renderer needs for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub mode: ModeView,
    pub status: DriverStatus,
    pub status_label: String,

    /// Remaining closure time before the next alarm, never negative
    pub seconds_until_alarm: f64,

    /// Wall-clock length of the current closure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_seconds: Option<f64>,

    pub closed_duration_frames: u32,
    pub alarm_count: u32,
    pub max_alarms: u32,

    /// Last perception sample saw a face
    pub face_present: bool,

    /// Last perception sample saw both eyes
    pub eyes_open: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<EmergencyProgress>,
}

/// Final counters reported on shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub total_alarms: u32,
    pub reached_emergency: bool,
    pub emergency_completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_status_bands() {
        let mode = ModeView::Normal;
        assert_eq!(derive_status(&mode, 0, 150), DriverStatus::Awake);
        assert_eq!(derive_status(&mode, 45, 150), DriverStatus::Awake);
        assert_eq!(derive_status(&mode, 46, 150), DriverStatus::StayAlert);
        assert_eq!(derive_status(&mode, 105, 150), DriverStatus::StayAlert);
        assert_eq!(derive_status(&mode, 106, 150), DriverStatus::DrowsyWarning);
    }

    #[test]
    fn test_emergency_status() {
        let running = ModeView::Emergency {
            elapsed_seconds: 3.0,
            completed: false,
        };
        let done = ModeView::Emergency {
            elapsed_seconds: 20.0,
            completed: true,
        };
        assert_eq!(derive_status(&running, 0, 150), DriverStatus::EmergencyStop);
        assert_eq!(derive_status(&done, 0, 150), DriverStatus::VehicleStopped);
        assert_eq!(DriverStatus::VehicleStopped.label(), "VEHICLE STOPPED");
    }

    #[test]
    fn test_mode_view_serialization() {
        let json = serde_json::to_string(&ModeView::Normal).unwrap();
        assert_eq!(json, r#"{"mode":"normal"}"#);
    }
}
