//! Perception input
//!
//! The external detector writes one JSON object per processed frame:
//!
//! ```text
//! {"face_present": true, "eyes_open_count": 2}
//! null
//! {"command": "reset"}
//! ```
//!
//! `null` marks a frame where perception produced nothing. Lines carrying a
//! `command` are operator commands (`reset`, `test_alarm`, `quit`).

use std::time::Instant;

use drowsiness::{OperatorCommand, PerceptionSample};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::monitor::{self, MonitorInput};

/// Frame observation as written by the detector
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FrameObservation {
    pub face_present: bool,
    #[serde(default)]
    pub eyes_open_count: u8,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PerceptionLine {
    Command { command: OperatorCommand },
    Frame(FrameObservation),
    Absent,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(
    line: &str,
    timestamp: Instant,
) -> Result<Option<MonitorInput>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let input = match serde_json::from_str::<PerceptionLine>(line)? {
        PerceptionLine::Command { command } => MonitorInput::Command(command),
        PerceptionLine::Frame(frame) => MonitorInput::Sample(PerceptionSample::new(
            timestamp,
            frame.face_present,
            frame.eyes_open_count,
        )),
        PerceptionLine::Absent => MonitorInput::Sample(PerceptionSample::absent(timestamp)),
    };
    Ok(Some(input))
}

/// Forward perception lines to the monitor until the stream ends, then ask it to quit
pub async fn read_perception<R>(
    reader: R,
    inputs: mpsc::Sender<MonitorInput>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match parse_line(&line, monitor::now()) {
            Ok(Some(input)) => {
                if inputs.send(input).await.is_err() {
                    debug!("Monitor stopped, closing perception reader");
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping malformed perception line {}: {}", line_no, e),
        }
    }

    info!("Perception stream ended after {} lines", line_no);
    let _ = inputs.send(MonitorInput::Command(OperatorCommand::Quit)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame() {
        let now = Instant::now();
        let input = parse_line(r#"{"face_present": true, "eyes_open_count": 2}"#, now).unwrap();
        assert!(matches!(
            input,
            Some(MonitorInput::Sample(PerceptionSample {
                face_present: true,
                eyes_open_count: 2,
                ..
            }))
        ));
    }

    #[test]
    fn test_parse_absent_and_blank() {
        let now = Instant::now();
        assert!(matches!(
            parse_line("null", now).unwrap(),
            Some(MonitorInput::Sample(PerceptionSample { face_present: false, .. }))
        ));
        assert!(parse_line("   ", now).unwrap().is_none());
    }

    #[test]
    fn test_parse_commands() {
        let now = Instant::now();
        assert!(matches!(
            parse_line(r#"{"command": "reset"}"#, now).unwrap(),
            Some(MonitorInput::Command(OperatorCommand::Reset))
        ));
        assert!(matches!(
            parse_line(r#"{"command": "test_alarm"}"#, now).unwrap(),
            Some(MonitorInput::Command(OperatorCommand::ManualTestAlarm))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let now = Instant::now();
        assert!(parse_line("eyes closed", now).is_err());
        assert!(parse_line(r#"{"face_present": true, "eyes_open_count": 300}"#, now).is_err());
    }

    #[tokio::test]
    async fn test_reader_forwards_and_quits() {
        let input = b"{\"face_present\": true}\nnot json\n\n{\"command\": \"test_alarm\"}\n";
        let (tx, mut rx) = mpsc::channel(16);

        read_perception(&input[..], tx).await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(MonitorInput::Sample(PerceptionSample { eyes_open_count: 0, .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(MonitorInput::Command(OperatorCommand::ManualTestAlarm))
        ));
        assert!(matches!(rx.recv().await, Some(MonitorInput::Command(OperatorCommand::Quit))));
    }
}
