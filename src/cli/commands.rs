use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dp", about = concat!("dayplan v", env!("CARGO_PKG_VERSION"), " - one plan per day"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Day to work on (YYYY-MM-DD, default: today)
    #[arg(short, long, global = true)]
    pub date: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the day's plan (default command)
    Show(ShowArgs),
    /// Add a task
    Add(AddArgs),
    /// Edit task fields
    Edit(EditArgs),
    /// Mark a task complete
    Check(TaskIdArg),
    /// Mark a task incomplete
    Uncheck(TaskIdArg),
    /// Set task progress (0-100)
    Progress(ProgressArgs),
    /// Delete a task
    Rm(TaskIdArg),
    /// Move a task within the day's order
    Mv(MvArgs),
    /// List notes, or add/edit/remove one
    Note(NoteCmd),
    /// Set the day's name (empty clears it)
    Name(NameArgs),
    /// Carry over incomplete tasks from the previous day
    Spill(SpillArgs),
    /// Show or switch edit/view mode
    Mode(ModeArgs),
    /// Search all days by regex
    Search(SearchArgs),
    /// List or run start-time reminders
    Remind(RemindArgs),
    /// Show or edit configuration
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Open tasks by priority, completed last
    #[arg(long)]
    pub sorted: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Start time (HH:MM, default: now)
    #[arg(long)]
    pub start: Option<String>,
    /// End time (HH:MM, default: 23:59)
    #[arg(long)]
    pub end: Option<String>,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,
    /// none, weekly, fortnightly or monthly
    #[arg(short, long)]
    pub repeat: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID (or unique prefix)
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_start")]
    pub start: Option<String>,
    #[arg(long, conflicts_with = "clear_end")]
    pub end: Option<String>,
    /// Remove the start time
    #[arg(long)]
    pub clear_start: bool,
    /// Remove the end time (falls back to 23:59)
    #[arg(long)]
    pub clear_end: bool,
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Completion flag, set without touching progress
    #[arg(long)]
    pub done: Option<bool>,
    /// Progress, set without touching completion
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub progress: Option<u8>,
    #[arg(short, long)]
    pub repeat: Option<String>,
}

#[derive(Args)]
pub struct TaskIdArg {
    /// Task ID (or unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct ProgressArgs {
    /// Task ID (or unique prefix)
    pub id: String,
    #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
    pub value: u8,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID (or unique prefix)
    pub id: String,
    /// Move to the top
    #[arg(long, conflicts_with_all = ["bottom", "after"])]
    pub top: bool,
    /// Move to the bottom
    #[arg(long, conflicts_with = "after")]
    pub bottom: bool,
    /// Place after this task
    #[arg(long)]
    pub after: Option<String>,
}

// ---------------------------------------------------------------------------
// Note / plan args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NoteCmd {
    #[command(subcommand)]
    pub action: Option<NoteAction>,
}

#[derive(Subcommand)]
pub enum NoteAction {
    /// Add a note
    Add { content: String },
    /// Replace a note's content
    Edit { id: String, content: String },
    /// Delete a note
    Rm { id: String },
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args)]
pub struct SpillArgs {
    /// Only report whether there is anything to carry over
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct ModeArgs {
    /// edit, view or toggle (omit to show the current mode)
    pub mode: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern (case-insensitive)
    pub pattern: String,
}

#[derive(Args)]
pub struct RemindArgs {
    /// List upcoming reminders and exit
    #[arg(long)]
    pub list: bool,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a value, e.g. `dp config set defaults.priority high`
    Set { key: String, value: String },
}
