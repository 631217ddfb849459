pub mod task;
pub mod note;
pub mod plan;
pub mod config;

pub use task::*;
pub use note::*;
pub use plan::*;
pub use config::*;
