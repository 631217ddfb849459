//! Expansion of repeating tasks into future plans.
//!
//! Monthly occurrences are always computed from the anchor date (anchor + N
//! calendar months), clamping to the last day of shorter months, so an anchor
//! on the 31st lands on the 31st again whenever the month has one.

use chrono::{Days, Months, NaiveDate};

use crate::model::plan::{PlanCollection, date_key, ensure_plan};
use crate::model::task::{Recurrence, Task};

/// Number of future copies created for a repeating task
pub const RECURRENCE_INSTANCES: u32 = 12;

/// The `n`-th occurrence after `anchor` (n >= 1), or `None` for a
/// non-repeating pattern or a date out of range.
pub fn nth_occurrence(anchor: NaiveDate, pattern: Recurrence, n: u32) -> Option<NaiveDate> {
    match pattern {
        Recurrence::None => None,
        Recurrence::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
        Recurrence::Fortnightly => anchor.checked_add_days(Days::new(14 * u64::from(n))),
        Recurrence::Monthly => anchor.checked_add_months(Months::new(n)),
    }
}

/// The next `count` occurrence dates after `anchor`, anchor excluded
pub fn occurrence_dates(anchor: NaiveDate, pattern: Recurrence, count: u32) -> Vec<NaiveDate> {
    (1..=count)
        .map_while(|n| nth_occurrence(anchor, pattern, n))
        .collect()
}

/// Place a copy of `task` into each of the future plans for its repeat
/// pattern. Each copy gets a new id but keeps the original creation time.
/// Missing plans are created; existing tasks and notes are preserved.
/// Returns the date keys that received a copy.
pub fn materialize(plans: &mut PlanCollection, anchor: NaiveDate, task: &Task) -> Vec<String> {
    let mut keys = Vec::new();
    for date in occurrence_dates(anchor, task.repeat_pattern, RECURRENCE_INSTANCES) {
        let key = date_key(date);
        ensure_plan(plans, &key);
        if let Some(plan) = plans.get_mut(&key) {
            plan.tasks.push(task.clone_with_new_id());
            plan.touch();
            keys.push(key);
        }
    }
    keys
}
