//! Alarm debounce and escalation decision

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MonitorConfig;

/// Alarm bookkeeping (owned by [`AlarmController`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmState {
    /// Alarms fired since start or last reset
    pub alarm_count: u32,
    /// Time of the most recent alarm
    pub last_alarm_at: Option<Instant>,
}

/// Outcome of an alarm evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmDecision {
    /// Nothing to do: below threshold, cooling down, or already at max
    NoOp,
    /// Alarm fired without reaching the limit
    Fired { alarm_count: u32 },
    /// Alarm fired and reached `max_alarms`
    Escalate { alarm_count: u32 },
}

impl AlarmDecision {
    /// Whether an alarm was actually raised
    pub fn is_alarm(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// Watches the closed-eye duration and decides when to alarm or escalate
#[derive(Debug, Clone, Default)]
pub struct AlarmController {
    state: AlarmState,
}

impl AlarmController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the tracker's duration at `now`
    pub fn tick(
        &mut self,
        tracker_duration_frames: u32,
        now: Instant,
        config: &MonitorConfig,
    ) -> AlarmDecision {
        if tracker_duration_frames < config.alarm_frame_threshold() {
            return AlarmDecision::NoOp;
        }

        if let Some(last) = self.state.last_alarm_at {
            if now.saturating_duration_since(last) <= config.alarm_cooldown() {
                debug!("Alarm suppressed: in cooldown period");
                return AlarmDecision::NoOp;
            }
        }

        self.fire(now, config)
    }

    /// Raise an alarm unconditionally, short of the `max_alarms` cap.
    ///
    /// Shared by automatic alarms (after [`tick`](Self::tick)'s gates) and
    /// manual test alarms.
    pub fn fire(&mut self, now: Instant, config: &MonitorConfig) -> AlarmDecision {
        if self.state.alarm_count >= config.max_alarms {
            return AlarmDecision::NoOp;
        }

        self.state.alarm_count += 1;
        self.state.last_alarm_at = Some(now);

        if self.state.alarm_count >= config.max_alarms {
            AlarmDecision::Escalate {
                alarm_count: self.state.alarm_count,
            }
        } else {
            AlarmDecision::Fired {
                alarm_count: self.state.alarm_count,
            }
        }
    }

    pub fn alarm_count(&self) -> u32 {
        self.state.alarm_count
    }

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = AlarmState::default();
    }
}
