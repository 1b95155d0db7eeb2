use serde::{Deserialize, Serialize};

use crate::task::{Priority, SortKey};

use super::filter::Filter;

/// Descriptor for a task proposed by the intent service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    /// Natural-language due expression, if the service extracted one.
    #[serde(default)]
    pub due_text: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Whether the descriptor carries anything beyond plain text. Used to
    /// distinguish "probably a duplicate" from "implicit update".
    pub fn has_detail(&self) -> bool {
        self.due_text.is_some() || self.priority.is_some() || self.location.is_some()
    }
}

/// Relative due-date shift, applied to each target task independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueShift {
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub weeks: i64,
    #[serde(default)]
    pub months: i32,
}

impl DueShift {
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.weeks == 0 && self.months == 0
    }
}

/// Field updates carried by an `UpdateTask` action. Either absolute new
/// values or a relative date shift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdates {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_text: Option<String>,
    #[serde(default)]
    pub clear_due: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub due_shift: Option<DueShift>,
}

impl TaskUpdates {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.priority.is_none()
            && self.due_text.is_none()
            && !self.clear_due
            && self.location.is_none()
            && self.due_shift.map(|s| s.is_zero()).unwrap_or(true)
    }
}

/// What a query action wants to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Count,
    DueDate,
    Priority,
    Location,
    Details,
}

/// One intent from the external extraction service. An action list is
/// ephemeral: one list per voice command, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    AddTask { tasks: Vec<NewTask> },
    DeleteTask { filter: Filter },
    UpdateTask { filter: Filter, updates: TaskUpdates },
    MarkCompleted { filter: Filter },
    MarkIncomplete { filter: Filter },
    DeleteAll,
    DeleteOverdue,
    SortBy { key: SortKey },
    ShowTasks { filter: Filter },
    QueryTaskInfo { filter: Filter, query: QueryKind },
    Unknown,
}
