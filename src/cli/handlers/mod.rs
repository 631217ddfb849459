mod config;
pub use config::cmd_config;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, TimeDelta};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::context::PlannerContext;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::plan_io::{FileStorage, resolve_data_dir};
use crate::io::state::{SessionState, read_session_state, write_session_state};
use crate::logging;
use crate::model::config::PlannerConfig;
use crate::model::plan::parse_date_key;
use crate::model::task::{TaskDraft, TaskUpdate};
use crate::ops::search::build_regex;
use crate::ops::task_ops::InsertPosition;
use crate::reminder::{
    NoReminders, ReminderScheduler, StdoutNotifier, TimerScheduler, due_reminders,
};
use crate::store::PlanStore;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs besides its own arguments
struct Session {
    data_dir: PathBuf,
    config: PlannerConfig,
    date: NaiveDate,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref().map(Path::new))?;

    // Config commands must work even when config.toml is broken
    if let Some(Commands::Config(args)) = cli.command {
        return cmd_config(args, &data_dir, cli.json);
    }

    let config = config_io::read_config(&data_dir)?;
    if let Err(e) = logging::init_logging(&config.logging.level, &data_dir.join("logs")) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let date = match cli.date.as_deref() {
        Some(raw) => parse_day(raw)?,
        None => Local::now().date_naive(),
    };
    let session = Session {
        data_dir,
        config,
        date,
        json: cli.json,
    };

    match cli.command {
        None => cmd_show(&session, ShowArgs { sorted: false }),
        Some(cmd) => match cmd {
            // Read commands
            Commands::Show(args) => cmd_show(&session, args),
            Commands::Search(args) => cmd_search(&session, args),
            Commands::Remind(args) => cmd_remind(&session, args),

            // Write commands
            Commands::Add(args) => cmd_add(&session, args),
            Commands::Edit(args) => cmd_edit(&session, args),
            Commands::Check(args) => cmd_set_completion(&session, args, true),
            Commands::Uncheck(args) => cmd_set_completion(&session, args, false),
            Commands::Progress(args) => cmd_progress(&session, args),
            Commands::Rm(args) => cmd_rm(&session, args),
            Commands::Mv(args) => cmd_mv(&session, args),
            Commands::Note(args) => cmd_note(&session, args),
            Commands::Name(args) => cmd_name(&session, args),
            Commands::Spill(args) => cmd_spill(&session, args),
            Commands::Mode(args) => cmd_mode(&session, args),

            Commands::Config(_) => unreachable!("handled above"),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `--date`: a `YYYY-MM-DD` key or today/yesterday/tomorrow
fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match raw.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - TimeDelta::days(1)),
        "tomorrow" => Ok(today + TimeDelta::days(1)),
        other => parse_date_key(other)
            .ok_or_else(|| format!("invalid date '{}' (expected YYYY-MM-DD)", raw)),
    }
}

impl Session {
    /// Saved session mode, falling back to the configured default
    fn edit_mode(&self) -> bool {
        read_session_state(&self.data_dir)
            .and_then(|state| state.edit_mode)
            .unwrap_or(self.config.defaults.edit_mode)
    }

    /// Open the store on the session date inside a fresh context. Opening
    /// may create the day's plan, so callers hold the data-dir lock.
    fn open(&self, scheduler: Box<dyn ReminderScheduler>) -> Result<PlannerContext, Box<dyn std::error::Error>> {
        let store = PlanStore::open_at(
            Box::new(FileStorage::new(&self.data_dir)),
            scheduler,
            self.date,
            self.edit_mode(),
        )?;
        let mut ctx = PlannerContext::new();
        ctx.init(store);
        Ok(ctx)
    }

    /// Lock the data dir, open the store without reminders, run `f`, tear
    /// down. This is the load-mutate-save cycle of every write command.
    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut PlanStore) -> Result<T, Box<dyn std::error::Error>>,
    ) -> Result<T, Box<dyn std::error::Error>> {
        let _lock = FileLock::acquire_default(&self.data_dir)?;
        let mut ctx = self.open(Box::new(NoReminders))?;
        let result = f(ctx.store_mut()?);
        ctx.teardown()?;
        result
    }
}

/// Message for a mutation that did nothing because of view mode
fn view_mode_notice(what: &str) -> String {
    format!("view mode: {} not changed (run `dp mode edit` first)", what)
}

fn parse_times(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<String>, Option<String>), String> {
    let start = start.map(parse_time).transpose()?;
    let end = end.map(parse_time).transpose()?;
    Ok((start, end))
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(session: &Session, args: ShowArgs) -> CmdResult {
    session.with_store(|store| {
        let plan = store.current_plan();
        let tasks = if args.sorted {
            store.sorted_view()
        } else {
            plan.tasks.iter().collect()
        };
        let (remaining, total) = store.remaining_count();

        if session.json {
            let view = PlanViewJson {
                date: &plan.date,
                name: plan.name.as_deref(),
                edit_mode: store.is_edit_mode(),
                remaining,
                total,
                tasks,
                notes: &plan.notes,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            for line in format_plan(plan, &tasks, store.is_edit_mode()) {
                println!("{}", line);
            }
            let previous = store.check_for_previous_tasks();
            if let Some(prev) = previous.previous_date {
                println!();
                println!("{} has unfinished tasks (run `dp spill` to carry them over)", prev);
            }
        }
        Ok(())
    })
}

fn cmd_search(session: &Session, args: SearchArgs) -> CmdResult {
    let re = build_regex(&args.pattern)
        .map_err(|e| format!("invalid pattern '{}': {}", args.pattern, e))?;
    session.with_store(|store| {
        let hits = store.search(&re);
        if session.json {
            let items: Vec<_> = hits.iter().map(search_hit_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        } else if hits.is_empty() {
            println!("no matches");
        } else {
            for hit in &hits {
                println!("{}", format_search_hit(hit));
            }
        }
        Ok(())
    })
}

fn cmd_remind(session: &Session, args: RemindArgs) -> CmdResult {
    if args.list {
        return session.with_store(|store| {
            let upcoming = due_reminders(store.current_plan(), Local::now().naive_local());
            if session.json {
                println!("{}", serde_json::to_string_pretty(&upcoming)?);
            } else if upcoming.is_empty() {
                println!("no upcoming reminders");
            } else {
                for reminder in &upcoming {
                    println!("{}", format_reminder(reminder));
                }
            }
            Ok(())
        });
    }

    if !session.config.reminders.enabled {
        return Err("reminders are disabled (dp config set reminders.enabled true)".into());
    }

    // Only hold the lock while loading; waiting can take hours
    let mut ctx = {
        let _lock = FileLock::acquire_default(&session.data_dir)?;
        session.open(Box::new(TimerScheduler::new(StdoutNotifier)))?
    };

    let scheduled = ctx.store()?.reminders().to_vec();
    if scheduled.is_empty() {
        println!("no upcoming reminders");
    } else {
        println!("waiting for {} reminder(s):", scheduled.len());
        for reminder in &scheduled {
            println!("  {}", format_reminder(reminder));
        }
        ctx.store_mut()?.wait_for_reminders();
    }

    let _lock = FileLock::acquire_default(&session.data_dir)?;
    ctx.teardown()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(session: &Session, args: AddArgs) -> CmdResult {
    let title = args.title.trim().to_string();
    if title.is_empty() {
        return Err("task title cannot be empty".into());
    }
    let (start_time, end_time) = parse_times(args.start.as_deref(), args.end.as_deref())?;
    let priority = match args.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => session.config.defaults.priority,
    };
    let recurrence = args.repeat.as_deref().map(parse_recurrence).transpose()?;

    let draft = TaskDraft {
        start_time,
        end_time,
        priority,
        recurrence: recurrence.unwrap_or_default(),
        ..TaskDraft::new(title)
    };

    session.with_store(|store| {
        let id = store.add_task(draft)?;
        if session.json {
            println!("{}", serde_json::json!({ "id": id }));
        } else {
            println!("{}", id);
        }
        Ok(())
    })
}

fn cmd_edit(session: &Session, args: EditArgs) -> CmdResult {
    let (start, end) = parse_times(args.start.as_deref(), args.end.as_deref())?;
    let update = TaskUpdate {
        title: args.title.map(|t| t.trim().to_string()),
        is_completed: args.done,
        start_time: if args.clear_start { Some(None) } else { start.map(Some) },
        end_time: if args.clear_end { Some(None) } else { end.map(Some) },
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        progress: args.progress,
        recurrence: args.repeat.as_deref().map(parse_recurrence).transpose()?,
    };
    if update.is_empty() {
        return Err("nothing to change (see `dp edit --help`)".into());
    }
    if update.title.as_deref() == Some("") {
        return Err("task title cannot be empty".into());
    }

    session.with_store(|store| {
        let id = store.resolve_task_id(&args.id)?;
        store.edit_fields(&id, update)?;
        println!("{} updated", short_id(&id));
        Ok(())
    })
}

fn cmd_set_completion(session: &Session, args: TaskIdArg, checked: bool) -> CmdResult {
    session.with_store(|store| {
        let id = store.resolve_task_id(&args.id)?;
        store.set_completion(&id, checked)?;
        let mark = if checked { "done" } else { "open" };
        println!("{} -> {}", short_id(&id), mark);
        Ok(())
    })
}

fn cmd_progress(session: &Session, args: ProgressArgs) -> CmdResult {
    session.with_store(|store| {
        let id = store.resolve_task_id(&args.id)?;
        store.set_progress(&id, args.value)?;
        println!("{} -> {}%", short_id(&id), args.value);
        Ok(())
    })
}

fn cmd_rm(session: &Session, args: TaskIdArg) -> CmdResult {
    session.with_store(|store| {
        let id = store.resolve_task_id(&args.id)?;
        if store.delete_task(&id)? {
            println!("deleted {}", short_id(&id));
        } else {
            eprintln!("{}", view_mode_notice("task"));
        }
        Ok(())
    })
}

fn cmd_mv(session: &Session, args: MvArgs) -> CmdResult {
    session.with_store(|store| {
        let id = store.resolve_task_id(&args.id)?;
        let position = if args.top {
            InsertPosition::Top
        } else if let Some(after) = args.after.as_deref() {
            InsertPosition::After(store.resolve_task_id(after)?)
        } else {
            InsertPosition::Bottom
        };
        if !store.move_task(&id, &position)? {
            return Err(format!("cannot move {} there", short_id(&id)).into());
        }
        println!("moved {}", short_id(&id));
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Notes, naming, spillover, mode
// ---------------------------------------------------------------------------

fn cmd_note(session: &Session, args: NoteCmd) -> CmdResult {
    session.with_store(|store| {
        match args.action {
            None => {
                let notes = &store.current_plan().notes;
                if session.json {
                    println!("{}", serde_json::to_string_pretty(notes)?);
                } else if notes.is_empty() {
                    println!("no notes");
                } else {
                    for note in notes {
                        println!("{}", format_note_line(note));
                    }
                }
            }
            Some(NoteAction::Add { content }) => match store.add_note(content)? {
                Some(id) => println!("{}", id),
                None => eprintln!("{}", view_mode_notice("notes")),
            },
            Some(NoteAction::Edit { id, content }) => {
                let id = store.resolve_note_id(&id)?;
                if store.update_note(&id, content)? {
                    println!("{} updated", short_id(&id));
                } else {
                    eprintln!("{}", view_mode_notice("note"));
                }
            }
            Some(NoteAction::Rm { id }) => {
                let id = store.resolve_note_id(&id)?;
                if store.delete_note(&id)? {
                    println!("deleted {}", short_id(&id));
                } else {
                    eprintln!("{}", view_mode_notice("note"));
                }
            }
        }
        Ok(())
    })
}

fn cmd_name(session: &Session, args: NameArgs) -> CmdResult {
    session.with_store(|store| {
        if !store.set_plan_name(&args.name)? {
            eprintln!("{}", view_mode_notice("name"));
            return Ok(());
        }
        match &store.current_plan().name {
            Some(name) => println!("{} -> {}", store.current_key(), name),
            None => println!("{} name cleared", store.current_key()),
        }
        Ok(())
    })
}

fn cmd_spill(session: &Session, args: SpillArgs) -> CmdResult {
    session.with_store(|store| {
        let previous = store.check_for_previous_tasks();
        if args.check {
            if session.json {
                println!("{}", serde_json::to_string_pretty(&previous)?);
            } else {
                match &previous.previous_date {
                    Some(date) => println!("{} has unfinished tasks", date),
                    None => println!("nothing to carry over"),
                }
            }
            return Ok(());
        }

        if !previous.has_previous {
            println!("nothing to carry over");
            return Ok(());
        }
        if !store.is_edit_mode() {
            eprintln!("{}", view_mode_notice("plan"));
            return Ok(());
        }
        let count = store.import_previous_tasks()?;
        println!("carried over {} task(s) to {}", count, store.current_key());
        Ok(())
    })
}

fn cmd_mode(session: &Session, args: ModeArgs) -> CmdResult {
    let mode = session.with_store(|store| {
        match args.mode.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => {}
            Some("toggle") => {
                store.toggle_edit_mode();
            }
            Some("edit") => store.set_edit_mode(true),
            Some("view") => store.set_edit_mode(false),
            Some(other) => {
                return Err(format!("unknown mode '{}' (expected: edit, view, toggle)", other).into());
            }
        }
        Ok(store.is_edit_mode())
    })?;

    if args.mode.is_some() {
        let state = SessionState {
            edit_mode: Some(mode),
        };
        write_session_state(&session.data_dir, &state)?;
        log::info!("event=mode_changed edit_mode={}", mode);
    }

    let label = if mode { "edit" } else { "view" };
    if session.json {
        println!("{}", serde_json::json!({ "mode": label }));
    } else {
        println!("{}", label);
    }
    Ok(())
}
