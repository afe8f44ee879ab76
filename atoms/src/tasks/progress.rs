use super::model::{ChecklistItem, Task, TaskStatus};

/// Rounded (half up) percentage of completed checklist items; 0 when empty.
pub fn checklist_progress(checklist: &[ChecklistItem]) -> u8 {
    let total = checklist.len();
    if total == 0 {
        return 0;
    }
    let completed = checklist.iter().filter(|item| item.completed).count();
    ((200 * completed + total) / (2 * total)) as u8
}

/// Status implied by a progress value on the checklist path.
pub fn status_for_progress(progress: u8) -> TaskStatus {
    match progress {
        0 => TaskStatus::Pending,
        100.. => TaskStatus::Completed,
        _ => TaskStatus::InProgress,
    }
}

/// Replace the checklist and re-derive progress and status from it.
pub fn apply_checklist(task: &mut Task, checklist: Vec<ChecklistItem>) {
    task.todo_checklist = checklist;
    task.progress = checklist_progress(&task.todo_checklist);
    task.status = status_for_progress(task.progress);
}

/// Apply a direct status transition. Completing a task completes its whole
/// checklist; other transitions leave progress alone.
pub fn apply_status(task: &mut Task, status: Option<TaskStatus>) {
    if let Some(status) = status {
        task.status = status;
    }
    if task.status == TaskStatus::Completed {
        for item in &mut task.todo_checklist {
            item.completed = true;
        }
        task.progress = 100;
    }
}
