use chrono::NaiveTime;

use crate::model::plan::DailyPlan;
use crate::model::task::{DEFAULT_END_TIME, Task, TaskDraft, TaskUpdate};

/// Error type for id lookups from user input
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("ambiguous id prefix '{prefix}' matches {count} entries")]
    Ambiguous { prefix: String, count: usize },
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Fill in the default start/end times for a new task.
/// Start defaults to `now` as `HH:MM`, end to 23:59.
pub fn apply_draft_defaults(draft: &mut TaskDraft, now: NaiveTime) {
    if is_blank(&draft.start_time) {
        draft.start_time = Some(now.format("%H:%M").to_string());
    }
    if is_blank(&draft.end_time) {
        draft.end_time = Some(DEFAULT_END_TIME.to_string());
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Append a task to the plan
pub fn push_task(plan: &mut DailyPlan, task: Task) {
    plan.tasks.push(task);
    plan.touch();
}

// ---------------------------------------------------------------------------
// Update paths
// ---------------------------------------------------------------------------

/// Direct edit: shallow merge, no completion/progress reconciliation.
/// Returns false (and leaves the plan untouched) when the id is unknown.
pub fn update_task(plan: &mut DailyPlan, task_id: &str, update: TaskUpdate) -> bool {
    let Some(task) = plan.find_task_mut(task_id) else {
        return false;
    };
    task.apply(update);
    plan.touch();
    true
}

/// Checkbox path: checking forces progress to 100, unchecking keeps it.
pub fn set_completion(plan: &mut DailyPlan, task_id: &str, checked: bool) -> bool {
    let Some(task) = plan.find_task(task_id) else {
        return false;
    };
    let progress = if checked { 100 } else { task.progress };
    update_task(
        plan,
        task_id,
        TaskUpdate {
            is_completed: Some(checked),
            progress: Some(progress),
            ..Default::default()
        },
    )
}

/// Slider path: progress only, completion is left as is.
pub fn set_progress(plan: &mut DailyPlan, task_id: &str, value: u8) -> bool {
    update_task(
        plan,
        task_id,
        TaskUpdate {
            progress: Some(value.min(100)),
            ..Default::default()
        },
    )
}

/// Remove a task. Returns false when the id is unknown.
pub fn delete_task(plan: &mut DailyPlan, task_id: &str) -> bool {
    let before = plan.tasks.len();
    plan.tasks.retain(|t| t.id != task_id);
    if plan.tasks.len() == before {
        return false;
    }
    plan.touch();
    true
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Where to move a task within the manual order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    Top,
    Bottom,
    /// Directly after the task with this id
    After(String),
}

/// Replace the task sequence wholesale
pub fn reorder_tasks(plan: &mut DailyPlan, tasks: Vec<Task>) {
    plan.tasks = tasks;
    plan.touch();
}

/// Compute the task sequence that results from moving one task.
/// Returns `None` if the task (or the `After` target) is not in the plan.
pub fn moved_sequence(plan: &DailyPlan, task_id: &str, position: &InsertPosition) -> Option<Vec<Task>> {
    let mut tasks = plan.tasks.clone();
    let idx = tasks.iter().position(|t| t.id == task_id)?;
    if let InsertPosition::After(target) = position
        && (target == task_id || !tasks.iter().any(|t| t.id == *target))
    {
        return None;
    }
    let task = tasks.remove(idx);
    match position {
        InsertPosition::Top => tasks.insert(0, task),
        InsertPosition::Bottom => tasks.push(task),
        InsertPosition::After(target) => {
            let at = tasks.iter().position(|t| t.id == *target)?;
            tasks.insert(at + 1, task);
        }
    }
    Some(tasks)
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolve a (possibly abbreviated) id against a set of ids.
/// An exact match always wins over prefix matches.
pub fn resolve_prefix<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    prefix: &str,
) -> Result<String, TaskError> {
    let prefix = prefix.trim();
    let mut matches = Vec::new();
    for id in ids {
        if id == prefix {
            return Ok(id.to_string());
        }
        if !prefix.is_empty() && id.starts_with(prefix) {
            matches.push(id);
        }
    }
    match matches.len() {
        0 => Err(TaskError::NotFound(prefix.to_string())),
        1 => Ok(matches[0].to_string()),
        count => Err(TaskError::Ambiguous {
            prefix: prefix.to_string(),
            count,
        }),
    }
}

/// Resolve a task id prefix within a plan
pub fn resolve_task_id(plan: &DailyPlan, prefix: &str) -> Result<String, TaskError> {
    resolve_prefix(plan.tasks.iter().map(|t| t.id.as_str()), prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Priority;
    use chrono::Utc;

    fn task(id: &str, title: &str) -> Task {
        let mut t = Task::from_draft(TaskDraft::new(title), Utc::now());
        t.id = id.to_string();
        t
    }

    fn sample_plan() -> DailyPlan {
        let mut plan = DailyPlan::empty("2024-01-15".into(), Utc::now());
        plan.tasks.push(task("aaa-1", "First"));
        plan.tasks.push(task("bbb-2", "Second"));
        plan.tasks.push(task("bbc-3", "Third"));
        plan
    }

    fn ids(plan: &DailyPlan) -> Vec<&str> {
        plan.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn draft_defaults_fill_blank_times() {
        let mut draft = TaskDraft::new("Stand-up");
        draft.start_time = Some("  ".into());
        apply_draft_defaults(&mut draft, NaiveTime::from_hms_opt(8, 5, 0).unwrap());
        assert_eq!(draft.start_time.as_deref(), Some("08:05"));
        assert_eq!(draft.end_time.as_deref(), Some("23:59"));
    }

    #[test]
    fn draft_defaults_keep_given_times() {
        let mut draft = TaskDraft::new("Lunch");
        draft.start_time = Some("12:00".into());
        draft.end_time = Some("13:00".into());
        apply_draft_defaults(&mut draft, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(draft.start_time.as_deref(), Some("12:00"));
        assert_eq!(draft.end_time.as_deref(), Some("13:00"));
    }

    #[test]
    fn update_unknown_id_leaves_plan_untouched() {
        let mut plan = sample_plan();
        let before = plan.clone();
        assert!(!update_task(
            &mut plan,
            "nope",
            TaskUpdate {
                title: Some("x".into()),
                ..Default::default()
            }
        ));
        assert_eq!(plan, before);
    }

    #[test]
    fn checkbox_forces_progress() {
        let mut plan = sample_plan();
        set_progress(&mut plan, "aaa-1", 40);
        assert!(set_completion(&mut plan, "aaa-1", true));
        let t = plan.find_task("aaa-1").unwrap();
        assert!(t.is_completed);
        assert_eq!(t.progress, 100);

        set_completion(&mut plan, "aaa-1", false);
        let t = plan.find_task("aaa-1").unwrap();
        assert!(!t.is_completed);
        assert_eq!(t.progress, 100);
    }

    #[test]
    fn slider_does_not_flip_completion() {
        let mut plan = sample_plan();
        assert!(set_progress(&mut plan, "bbb-2", 100));
        let t = plan.find_task("bbb-2").unwrap();
        assert_eq!(t.progress, 100);
        assert!(!t.is_completed);

        set_progress(&mut plan, "bbb-2", 250);
        assert_eq!(plan.find_task("bbb-2").unwrap().progress, 100);
    }

    #[test]
    fn delete_task_removes_only_match() {
        let mut plan = sample_plan();
        assert!(delete_task(&mut plan, "bbb-2"));
        assert_eq!(ids(&plan), vec!["aaa-1", "bbc-3"]);

        let before = plan.clone();
        assert!(!delete_task(&mut plan, "bbb-2"));
        assert_eq!(plan, before);
    }

    #[test]
    fn moved_sequence_positions() {
        let plan = sample_plan();
        let top = moved_sequence(&plan, "bbc-3", &InsertPosition::Top).unwrap();
        assert_eq!(top[0].id, "bbc-3");

        let bottom = moved_sequence(&plan, "aaa-1", &InsertPosition::Bottom).unwrap();
        assert_eq!(bottom.last().unwrap().id, "aaa-1");

        let after = moved_sequence(&plan, "aaa-1", &InsertPosition::After("bbb-2".into())).unwrap();
        let order: Vec<&str> = after.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["bbb-2", "aaa-1", "bbc-3"]);
    }

    #[test]
    fn moved_sequence_rejects_unknown() {
        let plan = sample_plan();
        assert!(moved_sequence(&plan, "zzz", &InsertPosition::Top).is_none());
        assert!(moved_sequence(&plan, "aaa-1", &InsertPosition::After("zzz".into())).is_none());
        assert!(moved_sequence(&plan, "aaa-1", &InsertPosition::After("aaa-1".into())).is_none());
    }

    #[test]
    fn resolve_prefix_cases() {
        let plan = sample_plan();
        assert_eq!(resolve_task_id(&plan, "aa").unwrap(), "aaa-1");
        assert_eq!(resolve_task_id(&plan, "bbb-2").unwrap(), "bbb-2");
        assert!(matches!(
            resolve_task_id(&plan, "bb"),
            Err(TaskError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(resolve_task_id(&plan, "x"), Err(TaskError::NotFound(_))));
        assert!(matches!(resolve_task_id(&plan, ""), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn update_changes_priority_and_touches() {
        let mut plan = sample_plan();
        let stamp = plan.last_updated;
        std::thread::sleep(std::time::Duration::from_millis(2));
        update_task(
            &mut plan,
            "aaa-1",
            TaskUpdate {
                priority: Some(Priority::Low),
                ..Default::default()
            },
        );
        assert_eq!(plan.find_task("aaa-1").unwrap().priority, Priority::Low);
        assert!(plan.last_updated > stamp);
    }
}
