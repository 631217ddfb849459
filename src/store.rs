//! The plan store: owns the date-keyed plan collection, the date cursor and
//! the edit-mode gate, and persists the collection after every change.
//!
//! Failure policy:
//! - Unknown task/note ids are silent no-ops that leave `last_updated` alone.
//! - Gated operations outside edit mode are silent no-ops.
//! - Mutating methods return `Ok(false)` (or an empty result) for both of
//!   the above; `Err` only comes from the storage backend.

use chrono::{Local, NaiveDate, Utc};
use regex::Regex;

use crate::io::plan_io::{PlanStorage, StoreError};
use crate::model::plan::{DailyPlan, PlanCollection, date_key, ensure_plan};
use crate::model::task::{Task, TaskDraft, TaskUpdate};
use crate::ops::search::{SearchHit, search_plans};
use crate::ops::spillover::{PreviousTasks, check_previous, previous_key, spill_clones};
use crate::ops::task_ops::{InsertPosition, TaskError};
use crate::ops::{note_ops, recurrence, task_ops, view};
use crate::reminder::{Reminder, ReminderScheduler};

pub struct PlanStore {
    current_date: NaiveDate,
    plans: PlanCollection,
    edit_mode: bool,
    storage: Box<dyn PlanStorage>,
    scheduler: Box<dyn ReminderScheduler>,
    reminders: Vec<Reminder>,
}

impl PlanStore {
    /// Open the store on today's date in edit mode
    pub fn open(
        storage: Box<dyn PlanStorage>,
        scheduler: Box<dyn ReminderScheduler>,
    ) -> Result<Self, StoreError> {
        Self::open_at(storage, scheduler, Local::now().date_naive(), true)
    }

    /// Load the collection once and position the cursor on `date`
    pub fn open_at(
        storage: Box<dyn PlanStorage>,
        scheduler: Box<dyn ReminderScheduler>,
        date: NaiveDate,
        edit_mode: bool,
    ) -> Result<Self, StoreError> {
        let plans = storage.load()?;
        log::info!(
            "event=store_opened plans={} date={} edit_mode={}",
            plans.len(),
            date_key(date),
            edit_mode
        );
        let mut store = PlanStore {
            current_date: date,
            plans,
            edit_mode,
            storage,
            scheduler,
            reminders: Vec::new(),
        };
        store.ensure_plan_exists(&date_key(date))?;
        store.reschedule()?;
        Ok(store)
    }

    // -----------------------------------------------------------------------
    // State access
    // -----------------------------------------------------------------------

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn current_key(&self) -> String {
        date_key(self.current_date)
    }

    pub fn current_plan(&self) -> &DailyPlan {
        self.plans
            .get(&self.current_key())
            .expect("current plan is created whenever the cursor moves")
    }

    fn current_plan_mut(&mut self) -> &mut DailyPlan {
        let key = self.current_key();
        ensure_plan(&mut self.plans, &key);
        self.plans
            .get_mut(&key)
            .expect("current plan was just ensured")
    }

    pub fn plans(&self) -> &PlanCollection {
        &self.plans
    }

    /// Look up a plan without creating it
    pub fn plan(&self, key: &str) -> Option<&DailyPlan> {
        self.plans.get(key)
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Reminders currently scheduled for the current plan
    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    // -----------------------------------------------------------------------
    // Cursor and mode
    // -----------------------------------------------------------------------

    /// Move the cursor. The only side effect on the plans is creating the
    /// plan for the new date if it does not exist.
    pub fn set_current_date(&mut self, date: NaiveDate) -> Result<(), StoreError> {
        self.current_date = date;
        self.ensure_plan_exists(&date_key(date))?;
        self.reschedule()
    }

    /// Create an empty plan for `key` unless one exists. Returns true when
    /// a plan was created.
    pub fn ensure_plan_exists(&mut self, key: &str) -> Result<bool, StoreError> {
        if !ensure_plan(&mut self.plans, key) {
            return Ok(false);
        }
        log::debug!("event=plan_created date={}", key);
        self.persist()?;
        Ok(true)
    }

    /// Flip the edit/view gate. Returns the new mode.
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Add a task to the current plan. Start time defaults to now, end time
    /// to 23:59. A repeating task is also copied into its next
    /// occurrences. Returns the new task's id.
    pub fn add_task(&mut self, mut draft: TaskDraft) -> Result<String, StoreError> {
        task_ops::apply_draft_defaults(&mut draft, Local::now().time());
        let task = Task::from_draft(draft, Utc::now());
        let id = task.id.clone();

        task_ops::push_task(self.current_plan_mut(), task.clone());
        let copies = recurrence::materialize(&mut self.plans, self.current_date, &task);
        log::info!(
            "event=task_added date={} id={} repeat={} copies={}",
            self.current_key(),
            id,
            task.repeat_pattern.as_str(),
            copies.len()
        );

        self.persist()?;
        self.reschedule()?;
        Ok(id)
    }

    /// Merge `update` onto a task of the current plan. Not cascaded to
    /// copies of a repeating task.
    pub fn update_task(&mut self, task_id: &str, update: TaskUpdate) -> Result<bool, StoreError> {
        let changed = task_ops::update_task(self.current_plan_mut(), task_id, update);
        self.after_task_change(changed, "update_task", task_id)
    }

    /// Direct-edit path; completion and progress are not reconciled
    pub fn edit_fields(&mut self, task_id: &str, update: TaskUpdate) -> Result<bool, StoreError> {
        self.update_task(task_id, update)
    }

    /// Checkbox path; checking forces progress to 100
    pub fn set_completion(&mut self, task_id: &str, checked: bool) -> Result<bool, StoreError> {
        let changed = task_ops::set_completion(self.current_plan_mut(), task_id, checked);
        self.after_task_change(changed, "set_completion", task_id)
    }

    /// Slider path; completion is left as is
    pub fn set_progress(&mut self, task_id: &str, value: u8) -> Result<bool, StoreError> {
        let changed = task_ops::set_progress(self.current_plan_mut(), task_id, value);
        self.after_task_change(changed, "set_progress", task_id)
    }

    /// Gated by edit mode
    pub fn delete_task(&mut self, task_id: &str) -> Result<bool, StoreError> {
        if !self.gate("delete_task") {
            return Ok(false);
        }
        let changed = task_ops::delete_task(self.current_plan_mut(), task_id);
        self.after_task_change(changed, "delete_task", task_id)
    }

    /// Replace the task order wholesale. Allowed in view mode.
    pub fn reorder_tasks(&mut self, tasks: Vec<Task>) -> Result<(), StoreError> {
        task_ops::reorder_tasks(self.current_plan_mut(), tasks);
        log::debug!("event=tasks_reordered date={}", self.current_key());
        self.persist()?;
        self.reschedule()
    }

    /// Move one task within the manual order (via `reorder_tasks`)
    pub fn move_task(&mut self, task_id: &str, position: &InsertPosition) -> Result<bool, StoreError> {
        match task_ops::moved_sequence(self.current_plan(), task_id, position) {
            Some(tasks) => self.reorder_tasks(tasks).map(|_| true),
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Notes and naming (all gated by edit mode)
    // -----------------------------------------------------------------------

    /// Returns the new note id, or `None` in view mode
    pub fn add_note(&mut self, content: String) -> Result<Option<String>, StoreError> {
        if !self.gate("add_note") {
            return Ok(None);
        }
        let id = note_ops::add_note(self.current_plan_mut(), content);
        self.persist()?;
        Ok(Some(id))
    }

    pub fn update_note(&mut self, note_id: &str, content: String) -> Result<bool, StoreError> {
        if !self.gate("update_note") {
            return Ok(false);
        }
        let changed = note_ops::update_note(self.current_plan_mut(), note_id, content);
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn delete_note(&mut self, note_id: &str) -> Result<bool, StoreError> {
        if !self.gate("delete_note") {
            return Ok(false);
        }
        let changed = note_ops::delete_note(self.current_plan_mut(), note_id);
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Set the current plan's display name; an empty name clears it
    pub fn set_plan_name(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.gate("set_plan_name") {
            return Ok(false);
        }
        let plan = self.current_plan_mut();
        plan.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        plan.touch();
        self.persist()?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Spillover
    // -----------------------------------------------------------------------

    /// Whether yesterday (relative to the cursor) has incomplete tasks
    pub fn check_for_previous_tasks(&self) -> PreviousTasks {
        check_previous(&self.plans, self.current_date)
    }

    /// Copy yesterday's incomplete tasks into the current plan. Gated by
    /// edit mode. Returns how many tasks were imported.
    pub fn import_previous_tasks(&mut self) -> Result<usize, StoreError> {
        if !self.gate("import_previous_tasks") {
            return Ok(0);
        }
        let Some(prev_key) = previous_key(self.current_date) else {
            return Ok(0);
        };
        let clones = match self.plans.get(&prev_key) {
            Some(previous) => spill_clones(previous),
            None => return Ok(0),
        };
        if clones.is_empty() {
            return Ok(0);
        }

        let count = clones.len();
        let plan = self.current_plan_mut();
        plan.tasks.extend(clones);
        plan.touch();
        log::info!(
            "event=spillover_imported from={} to={} count={}",
            prev_key,
            self.current_key(),
            count
        );
        self.persist()?;
        self.reschedule()?;
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Views and lookup
    // -----------------------------------------------------------------------

    pub fn sorted_view(&self) -> Vec<&Task> {
        view::sorted_view(self.current_plan())
    }

    /// (incomplete, total) for the current plan
    pub fn remaining_count(&self) -> (usize, usize) {
        view::remaining_count(self.current_plan())
    }

    pub fn search(&self, re: &Regex) -> Vec<SearchHit> {
        search_plans(&self.plans, re)
    }

    pub fn resolve_task_id(&self, prefix: &str) -> Result<String, TaskError> {
        task_ops::resolve_task_id(self.current_plan(), prefix)
    }

    pub fn resolve_note_id(&self, prefix: &str) -> Result<String, TaskError> {
        note_ops::resolve_note_id(self.current_plan(), prefix)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Block until all scheduled reminders have fired
    pub fn wait_for_reminders(&mut self) {
        self.scheduler.wait();
    }

    /// Cancel all reminders and clear the reminder ledger
    pub fn shutdown(&mut self) -> Result<(), StoreError> {
        self.scheduler.cancel_all();
        self.reminders.clear();
        if self.scheduler.is_active() {
            self.storage.save_reminder_handles(&[])?;
        }
        log::debug!("event=store_closed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn gate(&self, op: &str) -> bool {
        if !self.edit_mode {
            log::debug!("event=mutation_suppressed op={} reason=view_mode", op);
        }
        self.edit_mode
    }

    fn after_task_change(&mut self, changed: bool, op: &str, task_id: &str) -> Result<bool, StoreError> {
        if !changed {
            log::debug!("event=task_not_found op={} id={}", op, task_id);
            return Ok(false);
        }
        self.persist()?;
        self.reschedule()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.storage.save(&self.plans).inspect_err(|e| {
            log::error!("event=plans_save_failed error={}", e);
        })
    }

    /// Rebuild reminders for the current plan and record their handles
    fn reschedule(&mut self) -> Result<(), StoreError> {
        let now = Local::now().naive_local();
        let key = self.current_key();
        let Some(plan) = self.plans.get(&key) else {
            return Ok(());
        };
        self.reminders = self.scheduler.schedule_all(plan, now);
        if self.scheduler.is_active() {
            let handles: Vec<String> = self.reminders.iter().map(|r| r.handle.clone()).collect();
            self.storage.save_reminder_handles(&handles)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::plan_io::MemoryStorage;
    use crate::model::task::{Priority, Recurrence};
    use crate::reminder::NoReminders;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn store_at(date: NaiveDate) -> (PlanStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = PlanStore::open_at(
            Box::new(storage.clone()),
            Box::new(NoReminders),
            date,
            true,
        )
        .unwrap();
        (store, storage)
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft::new(title)
    }

    #[test]
    fn open_creates_current_plan_and_persists_it() {
        let (store, storage) = store_at(d(2024, 1, 15));
        assert_eq!(store.current_plan().date, "2024-01-15");
        assert!(store.current_plan().tasks.is_empty());
        assert!(storage.saved().unwrap().contains_key("2024-01-15"));
    }

    #[test]
    fn reopening_does_not_duplicate_or_overwrite() {
        let (mut store, storage) = store_at(d(2024, 1, 15));
        store.add_task(draft("keep me")).unwrap();
        let reopened = PlanStore::open_at(
            Box::new(storage.clone()),
            Box::new(NoReminders),
            d(2024, 1, 15),
            true,
        )
        .unwrap();
        assert_eq!(reopened.plans().len(), 1);
        assert_eq!(reopened.current_plan().tasks.len(), 1);
    }

    #[test]
    fn add_task_applies_defaults() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let id = store.add_task(draft("Plan the week")).unwrap();
        let task = store.current_plan().find_task(&id).unwrap();
        assert_eq!(task.end_time.as_deref(), Some("23:59"));
        let start = task.start_time.as_deref().unwrap();
        assert_eq!(start.len(), 5);
        assert_eq!(&start[2..3], ":");
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn add_task_is_allowed_in_view_mode() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        store.toggle_edit_mode();
        store.add_task(draft("still added")).unwrap();
        assert_eq!(store.current_plan().tasks.len(), 1);
    }

    #[test]
    fn set_current_date_only_creates_plan() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        store.add_task(draft("a")).unwrap();
        let before = store.plan("2024-01-15").cloned();
        store.set_current_date(d(2030, 6, 1)).unwrap();
        assert_eq!(store.current_key(), "2030-06-01");
        assert!(store.current_plan().tasks.is_empty());
        assert_eq!(store.plan("2024-01-15").cloned(), before);
        assert_eq!(store.plans().len(), 2);
    }

    #[test]
    fn gated_operations_are_noops_in_view_mode() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let task_id = store.add_task(draft("task")).unwrap();
        let note_id = store.add_note("note".into()).unwrap().unwrap();
        assert!(!store.toggle_edit_mode());

        let before = store.current_plan().clone();
        assert!(!store.delete_task(&task_id).unwrap());
        assert!(store.add_note("x".into()).unwrap().is_none());
        assert!(!store.update_note(&note_id, "y".into()).unwrap());
        assert!(!store.delete_note(&note_id).unwrap());
        assert!(!store.set_plan_name("Name").unwrap());
        assert_eq!(store.import_previous_tasks().unwrap(), 0);
        assert_eq!(*store.current_plan(), before);
    }

    #[test]
    fn reorder_allowed_in_view_mode() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        store.add_task(draft("a")).unwrap();
        store.add_task(draft("b")).unwrap();
        store.set_edit_mode(false);
        let mut reversed = store.current_plan().tasks.clone();
        reversed.reverse();
        store.reorder_tasks(reversed.clone()).unwrap();
        assert_eq!(store.current_plan().tasks, reversed);
    }

    #[test]
    fn move_task_after_other() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let a = store.add_task(draft("a")).unwrap();
        let b = store.add_task(draft("b")).unwrap();
        let c = store.add_task(draft("c")).unwrap();
        assert!(store.move_task(&a, &InsertPosition::After(b.clone())).unwrap());
        let ids: Vec<&str> = store.current_plan().tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![b.as_str(), a.as_str(), c.as_str()]);
        assert!(!store.move_task("missing", &InsertPosition::Top).unwrap());
    }

    #[test]
    fn unknown_ids_do_not_bump_last_modified_or_persist() {
        let (mut store, storage) = store_at(d(2024, 1, 15));
        store.add_task(draft("a")).unwrap();
        store.add_note("n".into()).unwrap();
        let before = store.current_plan().clone();
        let saves = storage.save_count();

        assert!(!store.delete_task("nope").unwrap());
        assert!(!store.update_task("nope", TaskUpdate::default()).unwrap());
        assert!(!store.set_completion("nope", true).unwrap());
        assert!(!store.set_progress("nope", 10).unwrap());
        assert!(!store.update_note("nope", "x".into()).unwrap());
        assert!(!store.delete_note("nope").unwrap());

        assert_eq!(*store.current_plan(), before);
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn weekly_recurrence_creates_thirteen_instances() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let mut weekly = draft("Team sync");
        weekly.recurrence = Recurrence::Weekly;
        let id = store.add_task(weekly).unwrap();
        let original = store.current_plan().find_task(&id).unwrap().clone();

        let mut all = Vec::new();
        for n in 0..=12u64 {
            let key = date_key(d(2024, 1, 15) + chrono::Days::new(7 * n));
            let plan = store.plan(&key).unwrap();
            assert_eq!(plan.tasks.len(), 1, "plan {}", key);
            all.push(plan.tasks[0].clone());
        }
        assert_eq!(all.len(), 13);
        assert!(all.iter().all(|t| t.created_at == original.created_at));
        let mut ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 13);
        assert_eq!(store.plans().len(), 13);
    }

    #[test]
    fn update_does_not_cascade_to_recurring_copies() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let mut weekly = draft("Gym");
        weekly.recurrence = Recurrence::Weekly;
        let id = store.add_task(weekly).unwrap();
        store
            .update_task(
                &id,
                TaskUpdate {
                    title: Some("Swim".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.plan("2024-01-22").unwrap().tasks[0].title, "Gym");
    }

    #[test]
    fn spillover_scenario() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let t1 = store.add_task(draft("T1")).unwrap();
        let done = store.add_task(draft("finished")).unwrap();
        store.set_completion(&done, true).unwrap();

        store.set_current_date(d(2024, 1, 16)).unwrap();
        let plans_before = store.plans().clone();
        let check = store.check_for_previous_tasks();
        assert_eq!(store.check_for_previous_tasks(), check);
        assert_eq!(*store.plans(), plans_before);
        assert!(check.has_previous);
        assert_eq!(check.previous_date.as_deref(), Some("2024-01-15"));

        assert_eq!(store.import_previous_tasks().unwrap(), 1);
        let imported = &store.current_plan().tasks[0];
        assert_eq!(imported.title, "T1");
        assert!(!imported.is_completed);
        assert_eq!(imported.spilled_from.as_deref(), Some("2024-01-15"));
        assert_ne!(imported.id, t1);

        let source = store.plan("2024-01-15").unwrap().find_task(&t1).unwrap();
        assert!(!source.is_completed);
    }

    #[test]
    fn importing_twice_appends_twice() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        store.add_task(draft("open")).unwrap();
        store.set_current_date(d(2024, 1, 16)).unwrap();
        assert_eq!(store.import_previous_tasks().unwrap(), 1);
        assert_eq!(store.import_previous_tasks().unwrap(), 1);
        let tasks = &store.current_plan().tasks;
        assert_eq!(tasks.len(), 2);
        assert_ne!(tasks[0].id, tasks[1].id);
        assert_eq!(store.plan("2024-01-15").unwrap().tasks.len(), 1);
    }

    #[test]
    fn import_without_previous_plan_is_noop() {
        let (mut store, storage) = store_at(d(2024, 1, 16));
        let saves = storage.save_count();
        assert_eq!(store.import_previous_tasks().unwrap(), 0);
        assert!(store.plan("2024-01-15").is_none());
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn plan_name_set_and_clear() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        assert!(store.set_plan_name("  Deep work  ").unwrap());
        assert_eq!(store.current_plan().name.as_deref(), Some("Deep work"));
        store.set_plan_name("").unwrap();
        assert!(store.current_plan().name.is_none());
    }

    #[test]
    fn completion_paths_stay_divergent() {
        let (mut store, _) = store_at(d(2024, 1, 15));
        let id = store.add_task(draft("t")).unwrap();

        store.set_progress(&id, 100).unwrap();
        let t = store.current_plan().find_task(&id).unwrap();
        assert!(!t.is_completed);

        store
            .edit_fields(
                &id,
                TaskUpdate {
                    progress: Some(30),
                    is_completed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let t = store.current_plan().find_task(&id).unwrap();
        assert!(t.is_completed);
        assert_eq!(t.progress, 30);

        store.set_completion(&id, true).unwrap();
        assert_eq!(store.current_plan().find_task(&id).unwrap().progress, 100);
    }

    #[test]
    fn open_refuses_when_corrupt_file_cannot_be_backed_up() {
        use crate::io::plan_io::FileStorage;

        let dir = tempfile::TempDir::new().unwrap();
        let plans_path = dir.path().join("plans.json");
        std::fs::write(&plans_path, "{\"2024-01-15\": {\"date\"").unwrap();
        std::fs::create_dir(dir.path().join("plans.json.bak")).unwrap();

        let opened = PlanStore::open_at(
            Box::new(FileStorage::new(dir.path())),
            Box::new(NoReminders),
            d(2024, 1, 16),
            true,
        );
        assert!(matches!(opened, Err(StoreError::WriteError { .. })));
        assert_eq!(
            std::fs::read_to_string(&plans_path).unwrap(),
            "{\"2024-01-15\": {\"date\""
        );
    }
}
