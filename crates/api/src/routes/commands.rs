//! Operator Command Routes

use axum::{extract::State, http::StatusCode, Json};
use drowsiness::{ModeView, OperatorCommand};
use serde::Serialize;
use std::sync::Arc;

use crate::{AppState, MonitorInput};

/// Response for command endpoints
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub accepted: bool,
    pub command: OperatorCommand,
    /// Mode at the time the command was received
    pub mode: ModeView,
}

type CommandReply = (StatusCode, Json<CommandResponse>);

fn reply(
    status: StatusCode,
    accepted: bool,
    command: OperatorCommand,
    mode: ModeView,
) -> CommandReply {
    (
        status,
        Json(CommandResponse {
            accepted,
            command,
            mode,
        }),
    )
}

async fn submit(state: &AppState, command: OperatorCommand) -> CommandReply {
    let mode = state.status.borrow().mode;
    match state.commands.send(MonitorInput::Command(command)).await {
        Ok(()) => reply(StatusCode::ACCEPTED, true, command, mode),
        Err(_) => reply(StatusCode::SERVICE_UNAVAILABLE, false, command, mode),
    }
}

/// Reset tracker, alarms and mode
pub async fn reset(State(state): State<Arc<AppState>>) -> CommandReply {
    submit(&state, OperatorCommand::Reset).await
}

/// Raise a manual test alarm. Refused with 409 while the emergency stop runs.
pub async fn test_alarm(State(state): State<Arc<AppState>>) -> CommandReply {
    let mode = state.status.borrow().mode;
    if let ModeView::Emergency { .. } = mode {
        return reply(StatusCode::CONFLICT, false, OperatorCommand::ManualTestAlarm, mode);
    }
    submit(&state, OperatorCommand::ManualTestAlarm).await
}
