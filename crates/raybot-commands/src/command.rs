//! Command data structures.
//!
//! A command is queued by a client, picked up by the executor and driven
//! through its lifecycle until it reaches a terminal status.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::CommandError;
use crate::lifecycle::CancelableCommand;
use crate::payload::{Inputs, Outputs};

/// Command identifier, assigned on persistence.
pub type CommandId = i64;

/// Kind of robot-level command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    StopMovement,
    MoveForward,
    MoveBackward,
    MoveTo,
    CargoOpen,
    CargoClose,
    CargoLift,
    CargoLower,
    CargoCheckQr,
    ScanLocation,
    Wait,
}

impl CommandType {
    pub const ALL: [CommandType; 11] = [
        CommandType::StopMovement,
        CommandType::MoveForward,
        CommandType::MoveBackward,
        CommandType::MoveTo,
        CommandType::CargoOpen,
        CommandType::CargoClose,
        CommandType::CargoLift,
        CommandType::CargoLower,
        CommandType::CargoCheckQr,
        CommandType::ScanLocation,
        CommandType::Wait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::StopMovement => "STOP_MOVEMENT",
            CommandType::MoveForward => "MOVE_FORWARD",
            CommandType::MoveBackward => "MOVE_BACKWARD",
            CommandType::MoveTo => "MOVE_TO",
            CommandType::CargoOpen => "CARGO_OPEN",
            CommandType::CargoClose => "CARGO_CLOSE",
            CommandType::CargoLift => "CARGO_LIFT",
            CommandType::CargoLower => "CARGO_LOWER",
            CommandType::CargoCheckQr => "CARGO_CHECK_QR",
            CommandType::ScanLocation => "SCAN_LOCATION",
            CommandType::Wait => "WAIT",
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CommandError::InvalidCommandType(s.to_string()))
    }
}

/// Who issued the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    App,
    Cloud,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::App => "APP",
            Source::Cloud => "CLOUD",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APP" => Ok(Source::App),
            "CLOUD" => Ok(Source::Cloud),
            _ => Err(CommandError::InvalidSource(s.to_string())),
        }
    }
}

/// Command status.
///
/// `Queued -> Processing -> {Canceling -> {Canceled, Failed}, Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Queued,
    Processing,
    Canceling,
    Succeeded,
    Failed,
    Canceled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "QUEUED",
            Status::Processing => "PROCESSING",
            Status::Canceling => "CANCELING",
            Status::Succeeded => "SUCCEEDED",
            Status::Failed => "FAILED",
            Status::Canceled => "CANCELED",
        }
    }

    /// Check if command is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed | Status::Canceled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Queued, Status::Processing)
                | (Status::Processing, Status::Canceling)
                | (Status::Processing, Status::Succeeded)
                | (Status::Processing, Status::Failed)
                | (Status::Canceling, Status::Canceled)
                | (Status::Canceling, Status::Failed)
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Status::Queued),
            "PROCESSING" => Ok(Status::Processing),
            "CANCELING" => Ok(Status::Canceling),
            "SUCCEEDED" => Ok(Status::Succeeded),
            "FAILED" => Ok(Status::Failed),
            "CANCELED" => Ok(Status::Canceled),
            _ => Err(CommandError::InvalidStatus(s.to_string())),
        }
    }
}

/// A robot-level command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub id: CommandId,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub status: Status,
    pub source: Source,
    pub inputs: Inputs,
    /// Present only once the command succeeded.
    pub outputs: Option<Outputs>,
    /// Present only once the command failed.
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Idempotency token for duplicate suppression.
    pub request_id: String,
}

impl Command {
    /// Create a queued command. The type follows from `inputs`; a request id
    /// is generated when none is supplied.
    pub fn new(source: Source, inputs: Inputs, request_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            command_type: inputs.command_type(),
            status: Status::Queued,
            source,
            inputs,
            outputs: None,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            request_id: request_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// Move a queued command to `Processing` with a cancellation token
    /// derived from `parent`.
    ///
    /// # Panics
    ///
    /// Panics if the command is not `Queued`.
    pub fn begin_processing(mut self, parent: &CancellationToken) -> CancelableCommand {
        self.transition(Status::Processing);
        self.started_at = Some(self.updated_at);
        tracing::debug!(command_id = self.id, command_type = %self.command_type, "command processing");
        CancelableCommand::new(self, parent.child_token())
    }

    /// Apply a lifecycle transition, stamping `updated_at` and, for terminal
    /// states, `completed_at`.
    ///
    /// # Panics
    ///
    /// Panics on a transition the lifecycle does not allow.
    pub(crate) fn transition(&mut self, next: Status) {
        assert!(
            self.status.can_transition_to(next),
            "illegal command status transition {} -> {} (command {})",
            self.status,
            next,
            self.id
        );

        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
    }
}
