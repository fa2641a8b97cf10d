//! Closed-eye duration tracking

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{MonitorConfig, NoFacePolicy, PostAlarmPolicy, RecoveryPolicy};

/// One processed frame from the external face/eye detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptionSample {
    pub timestamp: Instant,
    pub face_present: bool,
    pub eyes_open_count: u8,
}

impl PerceptionSample {
    pub fn new(timestamp: Instant, face_present: bool, eyes_open_count: u8) -> Self {
        Self {
            timestamp,
            face_present,
            eyes_open_count,
        }
    }

    /// Sample used when the perception source produced nothing this frame
    pub fn absent(timestamp: Instant) -> Self {
        Self::new(timestamp, false, 0)
    }

    /// Both eyes detected
    pub fn eyes_open(&self) -> bool {
        self.eyes_open_count >= 2
    }
}

/// Tracker state (owned by [`DrowsinessTracker`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// Hysteresis counter of frames without open eyes
    pub closed_duration_frames: u32,

    /// Start of the current closure, cleared once eyes are seen open
    pub closed_since: Option<Instant>,
}

/// Result of feeding one sample to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackerEvent {
    /// Eyes open, counter reduced by the recovery policy
    Recovering { closed_duration_frames: u32 },

    /// Eyes not seen, counter increased
    Closing {
        closed_duration_frames: u32,
        elapsed_seconds: f64,
    },

    /// No face under [`NoFacePolicy::Freeze`], counter untouched
    Frozen { closed_duration_frames: u32 },
}

impl TrackerEvent {
    pub fn closed_duration_frames(&self) -> u32 {
        match *self {
            Self::Recovering { closed_duration_frames }
            | Self::Closing { closed_duration_frames, .. }
            | Self::Frozen { closed_duration_frames } => closed_duration_frames,
        }
    }
}

/// Integrates per-frame eye evidence into a closed-eye duration
#[derive(Debug, Clone, Default)]
pub struct DrowsinessTracker {
    state: TrackerState,
}

impl DrowsinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one perception sample
    pub fn observe(&mut self, sample: &PerceptionSample, config: &MonitorConfig) -> TrackerEvent {
        if sample.eyes_open() {
            return self.recover(config.recovery);
        }

        if sample.face_present {
            return self.close(sample.timestamp, config.closed_frame_increment);
        }

        match config.no_face {
            NoFacePolicy::Freeze => TrackerEvent::Frozen {
                closed_duration_frames: self.state.closed_duration_frames,
            },
            NoFacePolicy::TreatAsClosed => {
                self.close(sample.timestamp, config.closed_frame_increment)
            }
        }
    }

    fn recover(&mut self, policy: RecoveryPolicy) -> TrackerEvent {
        self.state.closed_duration_frames = match policy {
            RecoveryPolicy::FullReset => 0,
            RecoveryPolicy::Decay { step } => {
                self.state.closed_duration_frames.saturating_sub(step)
            }
        };
        self.state.closed_since = None;

        TrackerEvent::Recovering {
            closed_duration_frames: self.state.closed_duration_frames,
        }
    }

    fn close(&mut self, now: Instant, increment: u32) -> TrackerEvent {
        self.state.closed_duration_frames =
            self.state.closed_duration_frames.saturating_add(increment);
        let since = *self.state.closed_since.get_or_insert(now);

        TrackerEvent::Closing {
            closed_duration_frames: self.state.closed_duration_frames,
            elapsed_seconds: now.saturating_duration_since(since).as_secs_f64(),
        }
    }

    /// Shrink the counter after an alarm and restart the closure clock
    pub fn apply_post_alarm(&mut self, policy: PostAlarmPolicy, threshold: u32) {
        self.state.closed_duration_frames = match policy {
            PostAlarmPolicy::ResetToZero => 0,
            PostAlarmPolicy::ResetToHalfThreshold => threshold / 2,
        };
        self.state.closed_since = None;
    }

    /// Seconds since the current closure started
    pub fn closed_seconds(&self, now: Instant) -> Option<f64> {
        self.state
            .closed_since
            .map(|since| now.saturating_duration_since(since).as_secs_f64())
    }

    pub fn closed_duration_frames(&self) -> u32 {
        self.state.closed_duration_frames
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = TrackerState::default();
    }
}
