//! Command repository contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::command::{Command, CommandId, Status};
use crate::error::CommandError;
use crate::payload::Outputs;

/// Page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingParams {
    pub page: u32,
    pub page_size: u32,
}

impl PagingParams {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.limit()
    }

    pub fn limit(&self) -> usize {
        self.page_size.max(1) as usize
    }
}

impl Default for PagingParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE, Self::DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Type,
    Status,
    Source,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    CompletedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}

/// Filter, ordering and page for `list_commands`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCommandsParams {
    pub paging: PagingParams,
    /// Applied in order; ties fall back to id ascending.
    pub sorts: Vec<Sort>,
    /// Empty means any status.
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
}

/// Partial update. `None` leaves a field unchanged; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommandParams {
    pub id: CommandId,
    pub status: Option<Status>,
    pub outputs: Option<Option<Outputs>>,
    pub error: Option<Option<String>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateCommandParams {
    /// Update touching only `updated_at`.
    pub fn new(id: CommandId) -> Self {
        Self {
            id,
            status: None,
            outputs: None,
            error: None,
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_outputs(mut self, outputs: Option<Outputs>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_completed_at(mut self, completed_at: Option<DateTime<Utc>>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    /// Apply the present fields to `command`.
    pub fn apply(&self, command: &mut Command) {
        if let Some(status) = self.status {
            command.status = status;
        }
        if let Some(outputs) = &self.outputs {
            command.outputs = outputs.clone();
        }
        if let Some(error) = &self.error {
            command.error = error.clone();
        }
        if let Some(started_at) = self.started_at {
            command.started_at = started_at;
        }
        if let Some(completed_at) = self.completed_at {
            command.completed_at = completed_at;
        }
        command.updated_at = self.updated_at;
    }
}

/// Persistence for commands.
#[async_trait]
pub trait CommandRepository: Send + Sync {
    async fn list_commands(&self, params: ListCommandsParams)
        -> Result<Page<Command>, CommandError>;

    /// Oldest queued command.
    async fn get_next_executable_command(&self) -> Result<Command, CommandError>;

    /// The command occupying the executor (`Processing` or `Canceling`).
    async fn get_current_processing_command(&self) -> Result<Command, CommandError>;

    async fn get_command_by_id(&self, id: CommandId) -> Result<Command, CommandError>;

    /// Persist a new command and assign its id.
    async fn create_command(&self, command: Command) -> Result<Command, CommandError>;

    async fn update_command(&self, params: UpdateCommandParams) -> Result<Command, CommandError>;

    /// Cancel every queued, processing or canceling command.
    async fn cancel_pending_commands(&self) -> Result<(), CommandError>;

    async fn cancel_queued_and_processing_commands_created_by_cloud(
        &self,
    ) -> Result<(), CommandError>;

    /// Fails for a command that is processing or canceling.
    async fn delete_command_by_id(&self, id: CommandId) -> Result<(), CommandError>;

    /// Remove terminal commands created before `cutoff`.
    async fn delete_old_commands(&self, cutoff: DateTime<Utc>) -> Result<(), CommandError>;
}
