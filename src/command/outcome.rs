use serde::Serialize;
use uuid::Uuid;

use crate::intent::{Filter, StatusFilter};
use crate::task::{Priority, Task};

/// Per-kind tallies for one command batch, folded into the final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounters {
    pub added: u32,
    pub updated: u32,
    pub completed: u32,
    pub reopened: u32,
    pub deleted: u32,
    pub duplicates: u32,
    pub misses: u32,
    pub unknown: u32,
}

fn count(n: u32, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

impl ActionCounters {
    /// Whether any task mutation actually happened.
    pub fn any_effect(&self) -> bool {
        self.added + self.updated + self.completed + self.reopened + self.deleted > 0
    }

    /// Human-readable roll-up of what the batch did.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.added > 0 {
            parts.push(format!("added {}", count(self.added, "task")));
        }
        if self.updated > 0 {
            parts.push(format!("updated {}", count(self.updated, "task")));
        }
        if self.completed > 0 {
            parts.push(format!("completed {}", count(self.completed, "task")));
        }
        if self.reopened > 0 {
            parts.push(format!("reopened {}", count(self.reopened, "task")));
        }
        if self.deleted > 0 {
            parts.push(format!("deleted {}", count(self.deleted, "task")));
        }
        if self.duplicates > 0 {
            parts.push(format!("skipped {}", count(self.duplicates, "duplicate")));
        }

        if parts.is_empty() {
            if self.unknown > 0 {
                return "Sorry, I couldn't understand that command.".to_string();
            }
            if self.misses > 0 {
                return "No matching tasks were found.".to_string();
            }
            return "No changes made.".to_string();
        }

        let mut text = parts.join(", ");
        if let Some(first) = text.get(..1) {
            text = format!("{}{}", first.to_uppercase(), &text[1..]);
        }
        format!("{}.", text)
    }
}

/// One choice in a multi-select confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub id: Uuid,
    pub label: String,
}

/// A decision the caller must make before the batch can continue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PendingRequest {
    /// Plain yes/no gate for a destructive or bulk action.
    Confirm { prompt: String },
    /// Pick a subset of the matched tasks.
    Select {
        prompt: String,
        options: Vec<SelectOption>,
    },
}

/// Result of submitting (or resuming) one command batch.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    /// Per-action messages, in the order the actions ran.
    pub notices: Vec<String>,
    /// Read-only view produced by a show action, in display order.
    pub shown: Option<Vec<Task>>,
    /// Set when the batch is suspended waiting on the caller.
    pub pending: Option<PendingRequest>,
    pub counters: ActionCounters,
    pub summary: String,
}

impl CommandOutcome {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            notices: vec![message.into()],
            shown: None,
            pending: None,
            counters: ActionCounters::default(),
            summary: "No changes made.".to_string(),
        }
    }
}

/// Contextual message for a filtered view that matched nothing.
pub fn empty_view_message(filter: &Filter) -> String {
    match filter.status {
        Some(StatusFilter::Overdue) => return "No overdue tasks. You're all caught up.".to_string(),
        Some(StatusFilter::Completed) => return "No completed tasks yet.".to_string(),
        _ => {}
    }
    if filter.priorities.contains(&Priority::High) {
        return "No high priority tasks right now.".to_string();
    }
    if filter.due.is_some() {
        return "Nothing is due then.".to_string();
    }
    if let Some(topic) = &filter.topic {
        return format!("No tasks matching \"{}\".", topic);
    }
    "No tasks match that.".to_string()
}
