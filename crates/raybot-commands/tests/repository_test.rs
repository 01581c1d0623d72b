//! In-memory command repository tests.

use chrono::{Duration, Utc};
use raybot_commands::{
    Command, CommandError, CommandRepository, Inputs, ListCommandsParams, MemoryCommandRepository,
    MoveForwardInputs, Outputs, PagingParams, Sort, SortField, Source, Status,
    StopMovementInputs, UpdateCommandParams, WaitInputs,
};
use tokio_util::sync::CancellationToken;

fn wait(source: Source) -> Command {
    Command::new(source, Inputs::Wait(WaitInputs { duration_ms: 100 }), None)
}

async fn seed(repo: &MemoryCommandRepository, statuses: &[(Source, Status)]) -> Vec<Command> {
    let mut created = Vec::new();
    for (source, status) in statuses {
        let cmd = repo.create_command(wait(*source)).await.unwrap();
        let cmd = repo
            .update_command(UpdateCommandParams::new(cmd.id).with_status(*status))
            .await
            .unwrap();
        created.push(cmd);
    }
    created
}

#[tokio::test]
async fn test_create_assigns_monotonic_ids() {
    let repo = MemoryCommandRepository::new();
    let a = repo.create_command(wait(Source::App)).await.unwrap();
    let b = repo.create_command(wait(Source::Cloud)).await.unwrap();
    assert_eq!(a.id, 1);
    assert_eq!(b.id, 2);

    let fetched = repo.get_command_by_id(2).await.unwrap();
    assert_eq!(fetched, b);
    assert_eq!(
        repo.get_command_by_id(42).await.unwrap_err(),
        CommandError::NotFound(42)
    );
}

#[tokio::test]
async fn test_next_executable_is_oldest_queued() {
    let repo = MemoryCommandRepository::new();
    assert_eq!(
        repo.get_next_executable_command().await.unwrap_err(),
        CommandError::NoNextExecutable
    );

    seed(
        &repo,
        &[
            (Source::App, Status::Succeeded),
            (Source::App, Status::Queued),
            (Source::Cloud, Status::Queued),
        ],
    )
    .await;

    let next = repo.get_next_executable_command().await.unwrap();
    assert_eq!(next.id, 2);
}

#[tokio::test]
async fn test_processing_command_roundtrip() {
    let repo = MemoryCommandRepository::new();
    assert_eq!(
        repo.get_current_processing_command().await.unwrap_err(),
        CommandError::NoProcessingCommand
    );

    let cmd = repo
        .create_command(Command::new(
            Source::App,
            Inputs::MoveForward(MoveForwardInputs { motor_speed: 30 }),
            None,
        ))
        .await
        .unwrap();

    let mut cmd = cmd.begin_processing(&CancellationToken::new());
    repo.update_command(cmd.update_params()).await.unwrap();
    assert_eq!(repo.get_current_processing_command().await.unwrap().id, cmd.id());

    cmd.complete(Outputs::empty(cmd.command().command_type));
    let stored = repo.update_command(cmd.update_params()).await.unwrap();
    assert_eq!(&stored, cmd.command());
    assert!(repo.get_current_processing_command().await.is_err());
}

#[tokio::test]
async fn test_update_presence_semantics() {
    let repo = MemoryCommandRepository::new();
    let cmd = repo.create_command(wait(Source::App)).await.unwrap();

    let updated = repo
        .update_command(
            UpdateCommandParams::new(cmd.id)
                .with_status(Status::Failed)
                .with_error(Some("boom".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(updated.error.as_deref(), Some("boom"));

    // Absent fields stay untouched.
    let updated = repo
        .update_command(UpdateCommandParams::new(cmd.id))
        .await
        .unwrap();
    assert_eq!(updated.status, Status::Failed);
    assert_eq!(updated.error.as_deref(), Some("boom"));

    // Present-but-empty clears.
    let updated = repo
        .update_command(UpdateCommandParams::new(cmd.id).with_error(None))
        .await
        .unwrap();
    assert!(updated.error.is_none());

    assert_eq!(
        repo.update_command(UpdateCommandParams::new(99)).await.unwrap_err(),
        CommandError::NotFound(99)
    );
}

#[tokio::test]
async fn test_list_filters_sorts_and_pages() {
    let repo = MemoryCommandRepository::new();
    seed(
        &repo,
        &[
            (Source::App, Status::Queued),
            (Source::App, Status::Succeeded),
            (Source::Cloud, Status::Queued),
            (Source::App, Status::Queued),
            (Source::Cloud, Status::Failed),
        ],
    )
    .await;

    let page = repo
        .list_commands(ListCommandsParams {
            paging: PagingParams::new(1, 2),
            sorts: vec![Sort::desc(SortField::Id)],
            statuses: vec![Status::Queued],
        })
        .await
        .unwrap();
    assert_eq!(page.total_items, 3);
    let ids: Vec<_> = page.items.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![4, 3]);

    let page = repo
        .list_commands(ListCommandsParams {
            paging: PagingParams::new(2, 2),
            sorts: vec![Sort::desc(SortField::Id)],
            statuses: vec![Status::Queued],
        })
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1]);

    let page = repo
        .list_commands(ListCommandsParams {
            sorts: vec![Sort::asc(SortField::Source), Sort::desc(SortField::Id)],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_items, 5);
    let ids: Vec<_> = page.items.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![4, 2, 1, 5, 3]);
}

#[tokio::test]
async fn test_cancel_pending_commands() {
    let repo = MemoryCommandRepository::new();
    seed(
        &repo,
        &[
            (Source::App, Status::Queued),
            (Source::Cloud, Status::Processing),
            (Source::App, Status::Canceling),
            (Source::App, Status::Succeeded),
        ],
    )
    .await;

    repo.cancel_pending_commands().await.unwrap();

    let statuses: Vec<_> = repo
        .list_commands(ListCommandsParams::default())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|c| c.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            Status::Canceled,
            Status::Canceled,
            Status::Canceled,
            Status::Succeeded
        ]
    );
    assert!(repo.get_command_by_id(1).await.unwrap().completed_at.is_some());
}

#[tokio::test]
async fn test_cancel_cloud_commands_only() {
    let repo = MemoryCommandRepository::new();
    seed(
        &repo,
        &[
            (Source::Cloud, Status::Queued),
            (Source::Cloud, Status::Processing),
            (Source::App, Status::Queued),
            (Source::Cloud, Status::Canceling),
        ],
    )
    .await;

    repo.cancel_queued_and_processing_commands_created_by_cloud()
        .await
        .unwrap();

    assert_eq!(repo.get_command_by_id(1).await.unwrap().status, Status::Canceled);
    assert_eq!(repo.get_command_by_id(2).await.unwrap().status, Status::Canceled);
    assert_eq!(repo.get_command_by_id(3).await.unwrap().status, Status::Queued);
    assert_eq!(repo.get_command_by_id(4).await.unwrap().status, Status::Canceling);
}

#[tokio::test]
async fn test_delete_rejects_processing() {
    let repo = MemoryCommandRepository::new();
    seed(
        &repo,
        &[(Source::App, Status::Processing), (Source::App, Status::Queued)],
    )
    .await;

    assert_eq!(
        repo.delete_command_by_id(1).await.unwrap_err(),
        CommandError::InProcessingCannotBeDeleted(1)
    );
    repo.delete_command_by_id(2).await.unwrap();
    assert_eq!(repo.len().await, 1);
    assert_eq!(
        repo.delete_command_by_id(2).await.unwrap_err(),
        CommandError::NotFound(2)
    );
}

#[tokio::test]
async fn test_delete_old_commands_keeps_active() {
    let repo = MemoryCommandRepository::new();
    let old = Utc::now() - Duration::days(2);

    for status in [Status::Succeeded, Status::Queued] {
        let mut cmd = Command::new(Source::App, Inputs::StopMovement(StopMovementInputs {}), None);
        cmd.created_at = old;
        cmd.status = status;
        repo.create_command(cmd).await.unwrap();
    }
    let recent = repo
        .create_command(Command::new(
            Source::App,
            Inputs::StopMovement(StopMovementInputs {}),
            None,
        ))
        .await
        .unwrap();
    repo.update_command(UpdateCommandParams::new(recent.id).with_status(Status::Succeeded))
        .await
        .unwrap();

    repo.delete_old_commands(Utc::now() - Duration::days(1))
        .await
        .unwrap();

    assert_eq!(repo.len().await, 2);
    assert!(repo.get_command_by_id(1).await.is_err());
    assert_eq!(repo.get_command_by_id(2).await.unwrap().status, Status::Queued);
}
