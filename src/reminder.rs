//! Start-time reminders for the tasks of the current plan.
//!
//! The store hands the current plan to a [`ReminderScheduler`] whenever that
//! plan's task list changes. Schedulers always rebuild from scratch: every
//! call to `schedule_all` cancels what was scheduled before. How a reminder
//! is surfaced to the user is up to the [`Notifier`].

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::model::plan::{DailyPlan, parse_date_key};
use crate::model::task::new_id;

pub const REMINDER_TITLE: &str = "Task Reminder";

/// A reminder for one task's start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Opaque handle, persisted in the reminder ledger
    pub handle: String,
    pub task_id: String,
    pub title: String,
    /// Local wall-clock time
    pub fire_at: NaiveDateTime,
}

impl Reminder {
    pub fn body(&self) -> String {
        format!("Time to start: {}", self.title)
    }
}

/// Reminders for every incomplete task with a start time that is still
/// ahead of `now`. Past start times produce nothing.
pub fn due_reminders(plan: &DailyPlan, now: NaiveDateTime) -> Vec<Reminder> {
    let Some(date) = parse_date_key(&plan.date) else {
        return Vec::new();
    };
    plan.incomplete_tasks()
        .filter_map(|task| {
            let start = task.start_time.as_deref()?;
            let time = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
            let fire_at = date.and_time(time);
            (fire_at > now).then(|| Reminder {
                handle: new_id(),
                task_id: task.id.clone(),
                title: task.title.clone(),
                fire_at,
            })
        })
        .collect()
}

/// Surfaces a fired reminder to the user
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, title: &str, body: &str);
}

/// Prints reminders to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, title: &str, body: &str) {
        println!("{}: {}", title, body);
    }
}

pub trait ReminderScheduler {
    /// Cancel everything scheduled so far, then schedule the plan's due
    /// reminders. Returns what was scheduled.
    fn schedule_all(&mut self, plan: &DailyPlan, now: NaiveDateTime) -> Vec<Reminder>;

    fn cancel_all(&mut self);

    /// Whether this scheduler keeps live timers worth recording in the ledger
    fn is_active(&self) -> bool {
        true
    }

    /// Block until every scheduled reminder has fired or been cancelled
    fn wait(&mut self) {}
}

/// Scheduler that never schedules anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReminders;

impl ReminderScheduler for NoReminders {
    fn schedule_all(&mut self, _plan: &DailyPlan, _now: NaiveDateTime) -> Vec<Reminder> {
        Vec::new()
    }

    fn cancel_all(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }
}

struct Timer {
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

/// One sleeping thread per reminder. Dropping a timer's sender wakes the
/// thread early and it exits without notifying.
pub struct TimerScheduler<N: Notifier> {
    notifier: Arc<N>,
    timers: Vec<Timer>,
}

impl<N: Notifier> TimerScheduler<N> {
    pub fn new(notifier: N) -> Self {
        TimerScheduler {
            notifier: Arc::new(notifier),
            timers: Vec::new(),
        }
    }

    pub fn scheduled(&self) -> usize {
        self.timers.len()
    }

    fn spawn(&self, reminder: &Reminder, now: NaiveDateTime) -> Option<Timer> {
        let delay = (reminder.fire_at - now).to_std().ok()?;
        let (cancel, cancelled) = mpsc::channel::<()>();
        let notifier = Arc::clone(&self.notifier);
        let body = reminder.body();
        let handle = reminder.handle.clone();
        let thread = std::thread::Builder::new()
            .name(format!("reminder-{}", handle.chars().take(8).collect::<String>()))
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(delay) {
                    log::info!("event=reminder_fired handle={}", handle);
                    notifier.notify(REMINDER_TITLE, &body);
                }
            });
        match thread {
            Ok(thread) => Some(Timer { cancel, thread }),
            Err(e) => {
                log::error!("event=reminder_spawn_failed error={}", e);
                None
            }
        }
    }
}

impl<N: Notifier> ReminderScheduler for TimerScheduler<N> {
    fn schedule_all(&mut self, plan: &DailyPlan, now: NaiveDateTime) -> Vec<Reminder> {
        self.cancel_all();
        let mut scheduled = Vec::new();
        for reminder in due_reminders(plan, now) {
            if let Some(timer) = self.spawn(&reminder, now) {
                self.timers.push(timer);
                scheduled.push(reminder);
            }
        }
        log::debug!(
            "event=reminders_scheduled date={} count={}",
            plan.date,
            scheduled.len()
        );
        scheduled
    }

    fn cancel_all(&mut self) {
        for timer in self.timers.drain(..) {
            drop(timer.cancel);
            let _ = timer.thread.join();
        }
    }

    fn wait(&mut self) {
        for timer in self.timers.drain(..) {
            let _ = timer.thread.join();
            drop(timer.cancel);
        }
    }
}

impl<N: Notifier> Drop for TimerScheduler<N> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Task, TaskDraft};
    use chrono::{NaiveDate, TimeDelta, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl Notifier for Arc<Recording> {
        fn notify(&self, title: &str, body: &str) {
            self.0.lock().unwrap().push(format!("{}: {}", title, body));
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn plan(tasks: &[(&str, Option<&str>, bool)]) -> DailyPlan {
        let mut plan = DailyPlan::empty("2024-01-15".into(), Utc::now());
        for (title, start, done) in tasks {
            let mut draft = TaskDraft::new(*title);
            draft.start_time = start.map(str::to_string);
            draft.is_completed = *done;
            plan.tasks.push(Task::from_draft(draft, Utc::now()));
        }
        plan
    }

    #[test]
    fn due_reminders_skip_past_completed_and_untimed() {
        let plan = plan(&[
            ("past", Some("08:00"), false),
            ("exactly now", Some("09:00"), false),
            ("future", Some("10:30"), false),
            ("done", Some("11:00"), true),
            ("untimed", None, false),
            ("garbage", Some("noon"), false),
        ]);
        let due = due_reminders(&plan, at(9, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "future");
        assert_eq!(due[0].fire_at, at(10, 30));
        assert_eq!(due[0].body(), "Time to start: future");
    }

    #[test]
    fn reminders_for_other_days_use_plan_date() {
        let mut p = plan(&[("tomorrow", Some("07:00"), false)]);
        p.date = "2024-01-16".into();
        let due = due_reminders(&p, at(23, 0));
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn timer_fires_notification() {
        let recording = Arc::new(Recording::default());
        let mut scheduler = TimerScheduler::new(Arc::clone(&recording));
        let p = plan(&[("stretch", Some("10:00"), false)]);
        let now = at(10, 0) - TimeDelta::milliseconds(20);

        let scheduled = scheduler.schedule_all(&p, now);
        assert_eq!(scheduled.len(), 1);
        scheduler.wait();
        assert_eq!(
            *recording.0.lock().unwrap(),
            vec!["Task Reminder: Time to start: stretch".to_string()]
        );
    }

    #[test]
    fn rescheduling_cancels_previous_timers() {
        let recording = Arc::new(Recording::default());
        let mut scheduler = TimerScheduler::new(Arc::clone(&recording));
        let p = plan(&[("a", Some("10:00"), false), ("b", Some("11:00"), false)]);

        let first = scheduler.schedule_all(&p, at(9, 0));
        assert_eq!(scheduler.scheduled(), 2);
        let second = scheduler.schedule_all(&p, at(9, 0));
        assert_eq!(scheduler.scheduled(), 2);
        assert!(first.iter().all(|r| second.iter().all(|s| s.handle != r.handle)));

        scheduler.cancel_all();
        assert_eq!(scheduler.scheduled(), 0);
        assert!(recording.0.lock().unwrap().is_empty());
    }

    #[test]
    fn no_reminders_is_inactive() {
        let mut scheduler = NoReminders;
        let p = plan(&[("a", Some("10:00"), false)]);
        assert!(scheduler.schedule_all(&p, at(9, 0)).is_empty());
        assert!(!scheduler.is_active());
    }
}
