//! Dashboard statistics derived from the task list

use serde::Serialize;

use crate::models::{Task, TaskStatus};

/// How many tasks awaiting review are listed
pub const REVIEW_QUEUE_LEN: usize = 3;

/// Task counts shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// In Progress
    pub active: usize,
    pub completed: usize,
    /// Pending or in Review
    pub pending: usize,
    /// Critical priority and not yet Completed
    pub critical: usize,
    pub total: usize,
    /// First tasks awaiting review, in list order
    pub review_queue: Vec<Task>,
}

impl Dashboard {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        Self {
            active: count(TaskStatus::InProgress),
            completed: count(TaskStatus::Completed),
            pending: count(TaskStatus::Pending) + count(TaskStatus::Review),
            critical: tasks.iter().filter(|t| t.is_critical_open()).count(),
            total: tasks.len(),
            review_queue: tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Review)
                .take(REVIEW_QUEUE_LEN)
                .cloned()
                .collect(),
        }
    }
}
