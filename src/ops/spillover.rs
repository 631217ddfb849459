use chrono::NaiveDate;
use serde::Serialize;

use crate::model::plan::{DailyPlan, PlanCollection, date_key};
use crate::model::task::Task;

/// Result of looking for tasks to carry over from the previous day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousTasks {
    pub has_previous: bool,
    /// Date key of the previous plan, only when it has incomplete tasks
    pub previous_date: Option<String>,
}

/// Date key of the day before `date`
pub fn previous_key(date: NaiveDate) -> Option<String> {
    date.pred_opt().map(date_key)
}

/// Whether the day before `date` has incomplete tasks. Never creates plans.
pub fn check_previous(plans: &PlanCollection, date: NaiveDate) -> PreviousTasks {
    let found = previous_key(date).filter(|key| {
        plans
            .get(key)
            .is_some_and(|plan| plan.incomplete_tasks().next().is_some())
    });
    PreviousTasks {
        has_previous: found.is_some(),
        previous_date: found,
    }
}

/// Fresh copies of the incomplete tasks in `previous`, marked as spilled
/// from its date. The source plan is not modified.
pub fn spill_clones(previous: &DailyPlan) -> Vec<Task> {
    previous
        .incomplete_tasks()
        .map(|task| {
            let mut clone = task.clone_with_new_id();
            clone.spilled_from = Some(previous.date.clone());
            clone
        })
        .collect()
}
