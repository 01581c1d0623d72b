//! Command lifecycle.
//!
//! A [`CancelableCommand`] is a command in `Processing` or `Canceling`
//! paired with the cancellation token of its execution. It is owned by the
//! executor, which is the only caller allowed to move it through its states.

use tokio_util::sync::CancellationToken;

use crate::command::{Command, CommandId, Status};
use crate::payload::Outputs;
use crate::repository::UpdateCommandParams;

/// A command being executed, with its cancellation scope.
#[derive(Debug)]
pub struct CancelableCommand {
    command: Command,
    token: CancellationToken,
}

impl CancelableCommand {
    pub(crate) fn new(command: Command, token: CancellationToken) -> Self {
        Self { command, token }
    }

    pub fn id(&self) -> CommandId {
        self.command.id
    }

    pub fn status(&self) -> Status {
        self.command.status
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn into_command(self) -> Command {
        self.command
    }

    /// Token that dispatches for this command must observe.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn can_be_canceled(&self) -> bool {
        self.command.status == Status::Processing
    }

    /// Request cancellation.
    ///
    /// Moves a `Processing` command to `Canceling` and signals the token.
    /// In any other state this does nothing, so late or repeated requests
    /// are harmless.
    pub fn cancel(&mut self) {
        if !self.can_be_canceled() {
            tracing::debug!(
                command_id = self.command.id,
                status = %self.command.status,
                "cancel ignored"
            );
            return;
        }

        self.command.transition(Status::Canceling);
        self.token.cancel();
        tracing::info!(command_id = self.command.id, "command canceling");
    }

    /// Finish the command with `outputs`.
    ///
    /// If cancellation was requested, or the token was signaled by a parent,
    /// the command ends `Canceled` and the outputs are discarded.
    ///
    /// # Panics
    ///
    /// Panics if the command is already terminal.
    pub fn complete(&mut self, outputs: Outputs) {
        if self.cancellation_requested() {
            self.mark_canceled();
            return;
        }

        debug_assert_eq!(outputs.command_type(), self.command.command_type);
        self.command.transition(Status::Succeeded);
        self.command.outputs = Some(outputs);
        tracing::info!(command_id = self.command.id, "command succeeded");
    }

    /// Finish the command as failed.
    ///
    /// # Panics
    ///
    /// Panics if the command is already terminal.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.command.transition(Status::Failed);
        tracing::warn!(command_id = self.command.id, error = %error, "command failed");
        self.command.error = Some(error);
    }

    /// Finish the command as canceled after its work unwound.
    ///
    /// A `Processing` command passes through `Canceling` first.
    ///
    /// # Panics
    ///
    /// Panics if the command is already terminal.
    pub fn mark_canceled(&mut self) {
        if self.command.status == Status::Processing {
            self.command.transition(Status::Canceling);
            self.token.cancel();
        }

        self.command.transition(Status::Canceled);
        self.command.outputs = None;
        tracing::info!(command_id = self.command.id, "command canceled");
    }

    /// Partial repository update mirroring the current state.
    pub fn update_params(&self) -> UpdateCommandParams {
        let cmd = &self.command;
        UpdateCommandParams {
            id: cmd.id,
            status: Some(cmd.status),
            outputs: Some(cmd.outputs.clone()),
            error: Some(cmd.error.clone()),
            started_at: Some(cmd.started_at),
            completed_at: Some(cmd.completed_at),
            updated_at: cmd.updated_at,
        }
    }

    fn cancellation_requested(&self) -> bool {
        self.command.status == Status::Canceling || self.token.is_cancelled()
    }
}
