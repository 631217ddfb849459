use crate::model::plan::DailyPlan;
use crate::model::task::Task;

/// Display order: incomplete tasks by priority (high first, stable within a
/// priority), then completed tasks in manual order. Transient, the plan
/// itself keeps its manual order.
pub fn sorted_view(plan: &DailyPlan) -> Vec<&Task> {
    let mut open: Vec<&Task> = plan.incomplete_tasks().collect();
    open.sort_by_key(|t| t.priority.rank());
    open.extend(plan.tasks.iter().filter(|t| t.is_completed));
    open
}

/// (incomplete, total) task counts
pub fn remaining_count(plan: &DailyPlan) -> (usize, usize) {
    (plan.incomplete_tasks().count(), plan.tasks.len())
}
