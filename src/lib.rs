pub mod cli {
    pub mod commands;
    pub mod handlers;
    pub mod output;
}
pub mod context;
pub mod io {
    pub mod config_io;
    pub mod lock;
    pub mod plan_io;
    pub mod state;
}
pub mod logging;
pub mod model;
pub mod ops {
    pub mod note_ops;
    pub mod recurrence;
    pub mod search;
    pub mod spillover;
    pub mod task_ops;
    pub mod view;
}
pub mod reminder;
pub mod store;
