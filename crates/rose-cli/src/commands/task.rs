//! Task command handlers

use anyhow::{bail, Context, Result};

use rose_core::directory::{self, User};
use rose_core::models::{TaskDraft, TaskPriority, TaskStatus};
use rose_core::{Assistant, PushPolicy, SyncCoordinator};

use crate::output::Output;

/// Create a task (captain only)
pub async fn create(
    coordinator: &SyncCoordinator,
    actor: &User,
    draft: TaskDraft,
    output: &Output,
) -> Result<()> {
    if directory::by_callsign(&draft.assignee).is_none() {
        bail!(
            "Unknown assignee: '{}'\nKnown callsigns: {}",
            draft.assignee,
            directory::callsigns().collect::<Vec<_>>().join(", ")
        );
    }

    let committed = coordinator.create_task(actor, draft).await?;

    output.success(&format!("Task {} created", committed.value.id));
    output.print_task(&committed.value);
    output.print_pushes(&committed.pushes);
    Ok(())
}

/// List tasks, optionally filtered by status or assignee
pub async fn list(
    coordinator: &SyncCoordinator,
    status: Option<TaskStatus>,
    assignee: Option<String>,
    output: &Output,
) -> Result<()> {
    let store = coordinator.store().lock().await;
    let tasks: Vec<_> = store
        .tasks()
        .iter()
        .filter(|t| status.map_or(true, |s| t.status == s))
        .filter(|t| {
            assignee
                .as_deref()
                .map_or(true, |a| t.assignee.eq_ignore_ascii_case(a))
        })
        .collect();

    output.print_tasks(&tasks);
    Ok(())
}

/// Show one task
pub async fn show(coordinator: &SyncCoordinator, id: String, output: &Output) -> Result<()> {
    let store = coordinator.store().lock().await;
    let task = store
        .get_task(&id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    output.print_task(task);
    Ok(())
}

/// Move a task to a new status
pub async fn set_status(
    coordinator: &SyncCoordinator,
    id: String,
    status: TaskStatus,
    output: &Output,
) -> Result<()> {
    let committed = coordinator
        .update_task_status(&id, status)
        .await
        .with_context(|| format!("Failed to update task {}", id))?;

    output.success(&format!("{} is now {}", committed.value.id, committed.value.status));
    output.print_pushes(&committed.pushes);

    if coordinator.policy() == PushPolicy::AppendOnly
        && coordinator.cloud_config().is_active()
        && !output.is_quiet()
    {
        eprintln!(
            "Note: status edits are not pushed under the append_only policy.\n  \
             rose config set push_policy change_log"
        );
    }
    Ok(())
}

/// Ask the assistant for a risk assessment of a task
pub async fn analyze(
    coordinator: &SyncCoordinator,
    assistant: &Assistant,
    id: String,
    output: &Output,
) -> Result<()> {
    let description = {
        let store = coordinator.store().lock().await;
        let task = store
            .get_task(&id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
        format!("{}: {}", task.title, task.description)
    };

    output.message(&format!("Analyzing {}...", id));
    let reply = assistant.analyze_task_risk(&description).await;
    output.reply(&reply);
    Ok(())
}

/// Build a draft from command-line fields
pub fn draft(
    title: String,
    description: Option<String>,
    assignee: String,
    priority: Option<TaskPriority>,
    deadline: Option<String>,
) -> TaskDraft {
    TaskDraft {
        title,
        description: description.unwrap_or_default(),
        assignee,
        priority,
        deadline,
    }
}
