//! Monitor loop
//!
//! A single task owns the [`SystemController`]. Perception samples and
//! operator commands arrive on one channel, the emergency procedure is
//! advanced by a ticker, and every step publishes a fresh render model.

use std::time::{Duration, Instant};

use alerting::{AlertDispatcher, AlertKind};
use drowsiness::{
    ControlEvent, OperatorCommand, PerceptionSample, RenderModel, ShutdownReport, SystemController,
};
use metrics::{counter, gauge};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Current time on the runtime clock (follows tokio's paused clock in tests)
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Input to the monitor loop
#[derive(Debug, Clone, Copy)]
pub enum MonitorInput {
    Sample(PerceptionSample),
    Command(OperatorCommand),
}

/// Drives the controller and routes its side effects
pub struct Monitor {
    controller: SystemController,
    alerts: AlertDispatcher,
    status: watch::Sender<RenderModel>,
    tick_interval: Duration,
}

impl Monitor {
    /// Create the monitor and a receiver for its render models
    pub fn new(
        controller: SystemController,
        alerts: AlertDispatcher,
        tick_interval: Duration,
    ) -> (Self, watch::Receiver<RenderModel>) {
        let (status, status_rx) = watch::channel(controller.render(now()));
        (
            Self {
                controller,
                alerts,
                status,
                tick_interval,
            },
            status_rx,
        )
    }

    /// Run until `Quit` arrives or every input sender is gone
    pub async fn run(mut self, mut inputs: mpsc::Receiver<MonitorInput>) -> ShutdownReport {
        info!("Starting monitor loop (tick={:?})", self.tick_interval);
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                input = inputs.recv() => match input {
                    Some(MonitorInput::Sample(sample)) => self.controller.on_sample(sample),
                    Some(MonitorInput::Command(OperatorCommand::Quit)) | None => break,
                    Some(MonitorInput::Command(command)) => {
                        debug!("Operator command: {:?}", command);
                        if command == OperatorCommand::Reset {
                            counter!("drowsiness_resets_total").increment(1);
                        }
                        self.controller.apply_command(command, now())
                    }
                },
                _ = ticker.tick() => self.controller.on_tick(now()),
            };

            if let Some(event) = event {
                self.dispatch(event);
            }
            self.publish();
        }

        let report = self.controller.shutdown_report();
        info!(
            "Monitor stopped: total_alarms={}, emergency={}, vehicle_stopped={}",
            report.total_alarms, report.reached_emergency, report.emergency_completed
        );
        report
    }

    fn dispatch(&self, event: ControlEvent) {
        match event {
            ControlEvent::AlarmFired { manual, .. } => {
                counter!("drowsiness_alarms_total", "source" => source(manual)).increment(1);
            }
            ControlEvent::EmergencyStarted { manual, .. } => {
                counter!("drowsiness_alarms_total", "source" => source(manual)).increment(1);
                counter!("drowsiness_emergencies_total").increment(1);
            }
            ControlEvent::VehicleStopped { elapsed_seconds } => {
                counter!("drowsiness_vehicle_stopped_total").increment(1);
                info!("Stop notice: vehicle stopped after {:.1}s", elapsed_seconds);
            }
        }

        if let Some(kind) = audio_alert(&event) {
            if !self.alerts.trigger(kind) {
                debug!("Alarm sound not dispatched: {:?}", kind);
            }
        }
    }

    fn publish(&self) {
        let model = self.controller.render(now());
        gauge!("drowsiness_closed_frames").set(model.closed_duration_frames as f64);
        self.status.send_replace(model);
    }
}

/// Sound for an event; only alarms are audible
fn audio_alert(event: &ControlEvent) -> Option<AlertKind> {
    if !event.triggers_audio() {
        return None;
    }
    match *event {
        ControlEvent::AlarmFired { alarm_count, .. } => {
            Some(AlertKind::DrowsinessAlarm { alarm_count })
        }
        ControlEvent::EmergencyStarted { .. } => Some(AlertKind::EmergencyStarted),
        ControlEvent::VehicleStopped { .. } => None,
    }
}

fn source(manual: bool) -> &'static str {
    if manual {
        "manual"
    } else {
        "automatic"
    }
}
