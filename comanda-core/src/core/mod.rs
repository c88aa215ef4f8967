//! Configuration and background task plumbing.

mod config;
mod tasks;

pub use config::Config;
pub use tasks::{BackgroundTasks, PollHandle, TaskKind};
