use chrono::Utc;

use crate::model::note::Note;
use crate::model::plan::DailyPlan;
use crate::ops::task_ops::{TaskError, resolve_prefix};

/// Append a note. Returns the new note id.
pub fn add_note(plan: &mut DailyPlan, content: String) -> String {
    let note = Note::new(content, Utc::now());
    let id = note.id.clone();
    plan.notes.push(note);
    plan.touch();
    id
}

/// Replace a note's content. Returns false when the id is unknown.
pub fn update_note(plan: &mut DailyPlan, note_id: &str, content: String) -> bool {
    let Some(note) = plan.notes.iter_mut().find(|n| n.id == note_id) else {
        return false;
    };
    note.content = content;
    plan.touch();
    true
}

/// Remove a note. Returns false when the id is unknown.
pub fn delete_note(plan: &mut DailyPlan, note_id: &str) -> bool {
    let before = plan.notes.len();
    plan.notes.retain(|n| n.id != note_id);
    if plan.notes.len() == before {
        return false;
    }
    plan.touch();
    true
}

pub fn resolve_note_id(plan: &DailyPlan, prefix: &str) -> Result<String, TaskError> {
    resolve_prefix(plan.notes.iter().map(|n| n.id.as_str()), prefix)
}
