use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::note::Note;
use super::task::Task;

/// Format of a date key: `YYYY-MM-DD`
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// All plans, keyed by date key. This is the persisted unit.
pub type PlanCollection = BTreeMap<String, DailyPlan>;

/// The tasks and notes for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    /// Date key, also the key of this plan in the collection
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Manual order
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Insertion order
    #[serde(default)]
    pub notes: Vec<Note>,
    pub last_updated: DateTime<Utc>,
}

impl DailyPlan {
    /// An empty plan for `date`
    pub fn empty(date: String, now: DateTime<Utc>) -> Self {
        DailyPlan {
            date,
            name: None,
            tasks: Vec::new(),
            notes: Vec::new(),
            last_updated: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn find_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    pub fn find_note(&self, note_id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    pub fn incomplete_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_completed)
    }
}

/// Canonical date key for a calendar date
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a date key back into a calendar date
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Create the plan for `key` if it does not exist yet. Existing plans are
/// never touched. Returns true when a plan was created.
pub fn ensure_plan(plans: &mut PlanCollection, key: &str) -> bool {
    if plans.contains_key(key) {
        return false;
    }
    plans.insert(key.to_string(), DailyPlan::empty(key.to_string(), Utc::now()));
    true
}
