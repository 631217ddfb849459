use crate::io::plan_io::StoreError;
use crate::store::PlanStore;

/// Error type for planner context access
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("planner store used before it was initialized")]
    NotInitialized,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Holds the plan store between `init` and `teardown`. Consumers get the
/// store from here explicitly; using it while empty is a contract error.
#[derive(Default)]
pub struct PlannerContext {
    store: Option<PlanStore>,
}

impl PlannerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a store, returning the one it replaces (if any)
    pub fn init(&mut self, store: PlanStore) -> Option<PlanStore> {
        self.store.replace(store)
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Result<&PlanStore, PlannerError> {
        self.store.as_ref().ok_or(PlannerError::NotInitialized)
    }

    pub fn store_mut(&mut self) -> Result<&mut PlanStore, PlannerError> {
        self.store.as_mut().ok_or(PlannerError::NotInitialized)
    }

    /// Cancel reminders, clear the reminder ledger and drop the store.
    /// Tearing down an empty context does nothing.
    pub fn teardown(&mut self) -> Result<(), PlannerError> {
        if let Some(mut store) = self.store.take() {
            store.shutdown()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::plan_io::{MemoryStorage, PlanStorage};
    use crate::model::task::TaskDraft;
    use crate::reminder::{StdoutNotifier, TimerScheduler};
    use chrono::{Local, TimeDelta};

    #[test]
    fn uninitialized_context_fails_fast() {
        let mut ctx = PlannerContext::new();
        assert!(!ctx.is_initialized());
        assert!(matches!(ctx.store(), Err(PlannerError::NotInitialized)));
        assert!(matches!(ctx.store_mut(), Err(PlannerError::NotInitialized)));
        assert!(ctx.teardown().is_ok());
    }

    #[test]
    fn teardown_clears_reminder_ledger() {
        let storage = MemoryStorage::new();
        let soon = Local::now() + TimeDelta::hours(2);
        let store = PlanStore::open_at(
            Box::new(storage.clone()),
            Box::new(TimerScheduler::new(StdoutNotifier)),
            soon.date_naive(),
            true,
        )
        .unwrap();

        let mut ctx = PlannerContext::new();
        ctx.init(store);
        let mut draft = TaskDraft::new("later today");
        draft.start_time = Some(soon.format("%H:%M").to_string());
        ctx.store_mut().unwrap().add_task(draft).unwrap();

        let scheduled = ctx.store().unwrap().reminders().len();
        assert_eq!(storage.load_reminder_handles().len(), scheduled);

        ctx.teardown().unwrap();
        assert!(!ctx.is_initialized());
        assert!(storage.load_reminder_handles().is_empty());
    }
}
