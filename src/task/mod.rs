pub mod detect;
pub mod item;
pub mod priority;
pub mod store;
pub mod undo;

pub use detect::{detect_priority, PriorityHint};
pub use item::Task;
pub use priority::Priority;
pub use store::{DueChange, SortKey, TaskDraft, TaskPatch, TaskStore};
pub use undo::{UndoAction, UndoSlot};
