use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::Task;

/// Enough state to exactly invert one completed mutation.
///
/// `CompleteMany` doubles as the record for bulk field updates: inversion
/// is a full overwrite from the pre-mutation snapshots either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UndoAction {
    Add { id: Uuid },
    Delete { index: usize, task: Task },
    Update { before: Task },
    DeleteMany { tasks: Vec<(usize, Task)> },
    CompleteMany { before: Vec<Task> },
}

impl UndoAction {
    pub fn kind(&self) -> &'static str {
        match self {
            UndoAction::Add { .. } => "add",
            UndoAction::Delete { .. } => "delete",
            UndoAction::Update { .. } => "update",
            UndoAction::DeleteMany { .. } => "delete-many",
            UndoAction::CompleteMany { .. } => "complete-many",
        }
    }
}

/// Single-slot history of the most recent reversible mutation.
///
/// Every undo-eligible store mutation overwrites the slot; there is no
/// stack. Expiry is soft and enforced by the caller via [`expire`], so an
/// undo already in flight wins a race against the timeout.
///
/// [`expire`]: UndoSlot::expire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UndoSlot {
    entry: Option<(UndoAction, DateTime<Utc>)>,
}

impl UndoSlot {
    pub fn record(&mut self, action: UndoAction, at: DateTime<Utc>) {
        self.entry = Some((action, at));
    }

    pub fn take(&mut self) -> Option<UndoAction> {
        self.entry.take().map(|(action, _)| action)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn kind(&self) -> Option<&'static str> {
        self.entry.as_ref().map(|(action, _)| action.kind())
    }

    /// Drop the entry if it is older than `ttl` at `now`.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) {
        if let Some((_, recorded_at)) = &self.entry
            && now - *recorded_at > ttl
        {
            self.entry = None;
        }
    }
}
