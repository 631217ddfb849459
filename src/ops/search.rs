use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::model::plan::{DailyPlan, PlanCollection};

/// Which part of a plan matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    /// Plan display name
    Name,
    /// Task title
    Title,
    /// Note content
    Note,
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub date: String,
    pub field: MatchField,
    /// Task or note id; `None` for plan names
    pub id: Option<String>,
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Compile a user pattern, case-insensitive
pub fn build_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search every plan, oldest date first
pub fn search_plans(plans: &PlanCollection, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for plan in plans.values() {
        search_plan(re, plan, &mut hits);
    }
    hits
}

fn search_plan(re: &Regex, plan: &DailyPlan, hits: &mut Vec<SearchHit>) {
    let mut push = |field, id: Option<&str>, text: &str| {
        let spans = find_matches(re, text);
        if !spans.is_empty() {
            hits.push(SearchHit {
                date: plan.date.clone(),
                field,
                id: id.map(str::to_string),
                text: text.to_string(),
                spans,
            });
        }
    };

    if let Some(name) = &plan.name {
        push(MatchField::Name, None, name);
    }
    for task in &plan.tasks {
        push(MatchField::Title, Some(&task.id), &task.title);
    }
    for note in &plan.notes {
        push(MatchField::Note, Some(&note.id), &note.content);
    }
}
