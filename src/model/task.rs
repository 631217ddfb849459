use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default end time applied when a task would otherwise have none
pub const DEFAULT_END_TIME: &str = "23:59";

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Display rank: high sorts first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// How a newly added task repeats into future plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Weekly,
    Fortnightly,
    Monthly,
}

impl Recurrence {
    pub fn is_none(&self) -> bool {
        *self == Recurrence::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Weekly => "weekly",
            Recurrence::Fortnightly => "fortnightly",
            Recurrence::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Recurrence> {
        match s {
            "none" => Some(Recurrence::None),
            "weekly" => Some(Recurrence::Weekly),
            "fortnightly" => Some(Recurrence::Fortnightly),
            "monthly" => Some(Recurrence::Monthly),
            _ => None,
        }
    }
}

/// A task in a daily plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    /// `HH:MM`, no timezone
    #[serde(default)]
    pub start_time: Option<String>,
    /// `HH:MM`, no timezone
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// 0-100
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Recurrence::is_none")]
    pub repeat_pattern: Recurrence,
    /// Date key of the plan this task was carried over from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spilled_from: Option<String>,
}

/// Caller-supplied fields for a new task. The store assigns id and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Priority,
    pub is_completed: bool,
    pub progress: u8,
    pub recurrence: Recurrence,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update merged onto an existing task.
///
/// For the time fields the outer `Option` means "touch this field" and the
/// inner one is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub progress: Option<u8>,
    pub recurrence: Option<Recurrence>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }
}

impl Task {
    /// Build a task from a draft with a fresh id
    pub fn from_draft(draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Task {
            id: new_id(),
            title: draft.title,
            is_completed: draft.is_completed,
            start_time: draft.start_time,
            end_time: draft.end_time,
            priority: draft.priority,
            created_at,
            progress: draft.progress.min(100),
            repeat_pattern: draft.recurrence,
            spilled_from: None,
        }
    }

    /// Copy of this task under a fresh id; every other field is kept
    pub fn clone_with_new_id(&self) -> Self {
        Task {
            id: new_id(),
            ..self.clone()
        }
    }

    /// Shallow merge of `update` onto this task. An end time left unset by
    /// the merge becomes [`DEFAULT_END_TIME`].
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(done) = update.is_completed {
            self.is_completed = done;
        }
        if let Some(start) = update.start_time {
            self.start_time = start;
        }
        if let Some(end) = update.end_time {
            self.end_time = end;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(recurrence) = update.recurrence {
            self.repeat_pattern = recurrence;
        }
        if self.end_time.is_none() {
            self.end_time = Some(DEFAULT_END_TIME.to_string());
        }
    }
}

/// Fresh unique identifier for tasks and notes
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
