//! Command-resolution core of a voice-driven to-do manager.
//!
//! Speech capture, transcription, and intent extraction live outside this
//! crate. What lives here is everything between a loosely-typed action
//! list and a precise store mutation: reference resolution, duplicate
//! detection, confirmation gating, and a single-slot undo log.

pub mod api;
pub mod command;
pub mod config;
pub mod dates;
pub mod intent;
pub mod resolve;
pub mod services;
pub mod storage;
pub mod task;
pub mod utils;

pub use command::{CommandOutcome, Engine};
pub use config::Config;
pub use intent::{actions_from_value, Action};
pub use task::{Priority, SortKey, Task, TaskStore};
