//! In-memory command repository.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::command::{Command, CommandId, Source, Status};
use crate::error::CommandError;
use crate::repository::{
    CommandRepository, ListCommandsParams, Page, Sort, SortField, SortOrder, UpdateCommandParams,
};

#[derive(Default)]
struct Inner {
    commands: BTreeMap<CommandId, Command>,
    next_id: CommandId,
}

/// Command store kept in process memory.
///
/// One lock guards the whole collection, so a filtered read never sees a
/// command halfway through an update.
#[derive(Default)]
pub struct MemoryCommandRepository {
    inner: RwLock<Inner>,
}

impl MemoryCommandRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.commands.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cancel_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Command) -> bool + Send,
    {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let mut canceled = 0;
        for cmd in inner.commands.values_mut() {
            if !predicate(cmd) {
                continue;
            }
            cmd.status = Status::Canceled;
            cmd.outputs = None;
            cmd.error = None;
            cmd.completed_at = Some(now);
            cmd.updated_at = now;
            canceled += 1;
        }
        canceled
    }
}

fn compare(a: &Command, b: &Command, sort: &Sort) -> Ordering {
    let ordering = match sort.field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Type => a.command_type.as_str().cmp(b.command_type.as_str()),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::Source => a.source.as_str().cmp(b.source.as_str()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::StartedAt => a.started_at.cmp(&b.started_at),
        SortField::CompletedAt => a.completed_at.cmp(&b.completed_at),
    };
    match sort.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl CommandRepository for MemoryCommandRepository {
    async fn list_commands(
        &self,
        params: ListCommandsParams,
    ) -> Result<Page<Command>, CommandError> {
        let inner = self.inner.read().await;

        let mut matched: Vec<&Command> = inner
            .commands
            .values()
            .filter(|c| params.statuses.is_empty() || params.statuses.contains(&c.status))
            .collect();

        matched.sort_by(|a, b| {
            params
                .sorts
                .iter()
                .map(|sort| compare(a, b, sort))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        let total_items = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(params.paging.offset())
            .take(params.paging.limit())
            .cloned()
            .collect();

        Ok(Page { items, total_items })
    }

    async fn get_next_executable_command(&self) -> Result<Command, CommandError> {
        let inner = self.inner.read().await;
        inner
            .commands
            .values()
            .filter(|c| c.status == Status::Queued)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned()
            .ok_or(CommandError::NoNextExecutable)
    }

    async fn get_current_processing_command(&self) -> Result<Command, CommandError> {
        let inner = self.inner.read().await;
        inner
            .commands
            .values()
            .find(|c| matches!(c.status, Status::Processing | Status::Canceling))
            .cloned()
            .ok_or(CommandError::NoProcessingCommand)
    }

    async fn get_command_by_id(&self, id: CommandId) -> Result<Command, CommandError> {
        let inner = self.inner.read().await;
        inner
            .commands
            .get(&id)
            .cloned()
            .ok_or(CommandError::NotFound(id))
    }

    async fn create_command(&self, mut command: Command) -> Result<Command, CommandError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        command.id = inner.next_id;
        inner.commands.insert(command.id, command.clone());

        tracing::debug!(
            command_id = command.id,
            command_type = %command.command_type,
            source = %command.source,
            "command created"
        );
        Ok(command)
    }

    async fn update_command(&self, params: UpdateCommandParams) -> Result<Command, CommandError> {
        let mut inner = self.inner.write().await;
        let cmd = inner
            .commands
            .get_mut(&params.id)
            .ok_or(CommandError::NotFound(params.id))?;
        params.apply(cmd);
        Ok(cmd.clone())
    }

    async fn cancel_pending_commands(&self) -> Result<(), CommandError> {
        let canceled = self
            .cancel_where(|c| {
                matches!(
                    c.status,
                    Status::Queued | Status::Processing | Status::Canceling
                )
            })
            .await;
        tracing::info!(count = canceled, "canceled pending commands");
        Ok(())
    }

    async fn cancel_queued_and_processing_commands_created_by_cloud(
        &self,
    ) -> Result<(), CommandError> {
        let canceled = self
            .cancel_where(|c| {
                c.source == Source::Cloud
                    && matches!(c.status, Status::Queued | Status::Processing)
            })
            .await;
        tracing::info!(count = canceled, "canceled cloud commands");
        Ok(())
    }

    async fn delete_command_by_id(&self, id: CommandId) -> Result<(), CommandError> {
        let mut inner = self.inner.write().await;
        let cmd = inner.commands.get(&id).ok_or(CommandError::NotFound(id))?;
        if matches!(cmd.status, Status::Processing | Status::Canceling) {
            return Err(CommandError::InProcessingCannotBeDeleted(id));
        }
        inner.commands.remove(&id);
        Ok(())
    }

    async fn delete_old_commands(&self, cutoff: DateTime<Utc>) -> Result<(), CommandError> {
        let mut inner = self.inner.write().await;
        let before = inner.commands.len();
        inner
            .commands
            .retain(|_, c| !(c.status.is_terminal() && c.created_at < cutoff));
        tracing::debug!(count = before - inner.commands.len(), "deleted old commands");
        Ok(())
    }
}
