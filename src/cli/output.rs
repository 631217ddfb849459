use serde::Serialize;

use crate::model::note::Note;
use crate::model::plan::DailyPlan;
use crate::model::task::{Priority, Recurrence, Task};
use crate::ops::search::SearchHit;
use crate::reminder::Reminder;

/// Number of id characters shown in text output
pub const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanViewJson<'a> {
    pub date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub edit_mode: bool,
    pub remaining: usize,
    pub total: usize,
    pub tasks: Vec<&'a Task>,
    pub notes: &'a [Note],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitJson<'a> {
    pub date: &'a str,
    pub field: crate::ops::search::MatchField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub text: &'a str,
}

pub fn search_hit_to_json(hit: &SearchHit) -> SearchHitJson<'_> {
    SearchHitJson {
        date: &hit.date,
        field: hit.field,
        id: hit.id.as_deref(),
        text: &hit.text,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// First `SHORT_ID_LEN` characters of an id
pub fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(id, |(i, _)| &id[..i])
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!!",
        Priority::Medium => "!!",
        Priority::Low => "!",
    }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let check = if task.is_completed { 'x' } else { ' ' };
    let mut line = format!(
        "[{}] {} {:<3} {}",
        check,
        short_id(&task.id),
        priority_marker(task.priority),
        task.title
    );

    let times = match (task.start_time.as_deref(), task.end_time.as_deref()) {
        (Some(s), Some(e)) => Some(format!("{}-{}", s, e)),
        (Some(s), None) => Some(format!("{}-", s)),
        (None, Some(e)) => Some(format!("-{}", e)),
        (None, None) => None,
    };
    if let Some(times) = times {
        line.push_str(&format!("  {}", times));
    }
    if task.progress > 0 && task.progress < 100 {
        line.push_str(&format!("  {}%", task.progress));
    }
    if task.repeat_pattern != Recurrence::None {
        line.push_str(&format!("  ({})", task.repeat_pattern.as_str()));
    }
    if let Some(from) = &task.spilled_from {
        line.push_str(&format!("  <- {}", from));
    }
    line
}

pub fn format_note_line(note: &Note) -> String {
    let mut lines = note.content.lines();
    let first = lines.next().unwrap_or_default();
    let more = if lines.next().is_some() { " ..." } else { "" };
    format!("- {} {}{}", short_id(&note.id), first, more)
}

/// Format a whole plan for `dp show`
pub fn format_plan(plan: &DailyPlan, tasks: &[&Task], edit_mode: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let remaining = tasks.iter().filter(|t| !t.is_completed).count();

    let mut header = format!("== {}", plan.date);
    if let Some(name) = &plan.name {
        header.push_str(&format!(" - {}", name));
    }
    header.push_str(" ==");
    if !edit_mode {
        header.push_str(" [view]");
    }
    lines.push(header);
    lines.push(String::new());

    lines.push(format!("Tasks ({}/{} remaining)", remaining, tasks.len()));
    if tasks.is_empty() {
        lines.push("  no tasks yet".to_string());
    }
    for task in tasks {
        lines.push(format!("  {}", format_task_line(task)));
    }

    if !plan.notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes".to_string());
        for note in &plan.notes {
            lines.push(format!("  {}", format_note_line(note)));
        }
    }
    lines
}

pub fn format_search_hit(hit: &SearchHit) -> String {
    let id = hit.id.as_deref().map(short_id).unwrap_or("-");
    let field = match hit.field {
        crate::ops::search::MatchField::Name => "name",
        crate::ops::search::MatchField::Title => "task",
        crate::ops::search::MatchField::Note => "note",
    };
    format!("{} {:<4} {:<8} {}", hit.date, field, id, highlight(&hit.text, &hit.spans))
}

/// Wrap each matched range in brackets
fn highlight(text: &str, spans: &[std::ops::Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 2);
    let mut last = 0;
    for span in spans {
        out.push_str(&text[last..span.start]);
        out.push('[');
        out.push_str(&text[span.clone()]);
        out.push(']');
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

pub fn format_reminder(reminder: &Reminder) -> String {
    format!(
        "{}  {}  {}",
        reminder.fire_at.format("%H:%M"),
        short_id(&reminder.task_id),
        reminder.title
    )
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

pub fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s)
        .ok_or_else(|| format!("unknown priority '{}' (expected: low, medium, high)", s))
}

pub fn parse_recurrence(s: &str) -> Result<Recurrence, String> {
    Recurrence::parse(s).ok_or_else(|| {
        format!(
            "unknown repeat pattern '{}' (expected: none, weekly, fortnightly, monthly)",
            s
        )
    })
}

/// Validate a `HH:MM` time and return it zero-padded
pub fn parse_time(s: &str) -> Result<String, String> {
    chrono::NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("invalid time '{}' (expected HH:MM)", s))
}
