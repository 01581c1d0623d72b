//! Command error types.

use crate::command::CommandId;

/// Command error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(CommandId),

    #[error("No next executable command")]
    NoNextExecutable,

    #[error("No command is processing")]
    NoProcessingCommand,

    #[error("Command {0} is processing and can not be deleted")]
    InProcessingCannotBeDeleted(CommandId),

    #[error("Invalid command type: {0}")]
    InvalidCommandType(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Serialization(e.to_string())
    }
}
