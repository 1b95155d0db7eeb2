use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::dates::DateParser;

use super::item::Task;
use super::priority::Priority;
use super::undo::{UndoAction, UndoSlot};

/// Ordering criteria for display views. All sorts are stable: ties keep
/// their relative order from the underlying collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedDesc,
    DueDateAsc,
    UpdatedDesc,
    PriorityHighFirst,
    PriorityLowFirst,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::CreatedDesc => write!(f, "creation date"),
            SortKey::DueDateAsc => write!(f, "due date"),
            SortKey::UpdatedDesc => write!(f, "last updated"),
            SortKey::PriorityHighFirst => write!(f, "priority (high first)"),
            SortKey::PriorityLowFirst => write!(f, "priority (low first)"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "created" | "creation" | "creation_date" | "created_desc" | "newest" => {
                Ok(SortKey::CreatedDesc)
            }
            "due" | "due_date" | "duedate" | "due_date_asc" => Ok(SortKey::DueDateAsc),
            "updated" | "last_updated" | "updated_desc" | "recent" => Ok(SortKey::UpdatedDesc),
            "priority" | "priority_high" | "priority_high_first" | "high" => {
                Ok(SortKey::PriorityHighFirst)
            }
            "priority_low" | "priority_low_first" | "low" => Ok(SortKey::PriorityLowFirst),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

/// Fields for a brand new task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub location: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A change to a task's due date.
#[derive(Debug, Clone, PartialEq)]
pub enum DueChange {
    Date(NaiveDate),
    /// Natural-language expression, resolved through the injected parser at
    /// apply time. If it does not parse, the previous due date stays.
    Text(String),
    Clear,
}

/// Partial update merged onto an existing task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<DueChange>,
    pub location: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.priority.is_none()
            && self.due.is_none()
            && self.location.is_none()
    }
}

/// Owner of the task collection and the undo slot.
///
/// Operations referencing an id that is no longer present degrade to a
/// silent no-op. Upstream resolution should never produce unknown ids, but
/// idempotent retries must not fail.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    undo: UndoSlot,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            undo: UndoSlot::default(),
        }
    }

    pub fn from_parts(tasks: Vec<Task>, undo: UndoSlot) -> Self {
        Self { tasks, undo }
    }

    pub fn into_parts(self) -> (Vec<Task>, UndoSlot) {
        (self.tasks, self.undo)
    }

    /// Tasks in creation order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn undo_slot(&self) -> &UndoSlot {
        &self.undo
    }

    pub fn dismiss_undo(&mut self) {
        self.undo.clear();
    }

    pub fn expire_undo(&mut self, now: DateTime<Local>, ttl_secs: u64) {
        self.undo
            .expire(now.with_timezone(&Utc), Duration::seconds(ttl_secs as i64));
    }

    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Local>) -> Task {
        let now_utc = now.with_timezone(&Utc);
        let mut task = Task::new(draft.text, now_utc);
        task.priority = draft.priority;
        task.due_date = draft.due_date;
        task.location = draft.location;

        debug!(id = %task.id, text = %task.text, "create task");
        self.undo.record(UndoAction::Add { id: task.id }, now_utc);
        self.tasks.push(task.clone());
        task
    }

    /// Merge `patch` onto the task with `id`. Unknown id is a no-op.
    pub fn update(
        &mut self,
        id: Uuid,
        patch: TaskPatch,
        parser: &dyn DateParser,
        now: DateTime<Local>,
    ) {
        let now_utc = now.with_timezone(&Utc);
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            trace!(%id, "update: id not found, ignoring");
            return;
        };

        let before = self.tasks[index].clone();
        apply_patch(&mut self.tasks[index], patch, parser, now, now_utc);
        self.undo.record(UndoAction::Update { before }, now_utc);
    }

    /// Apply a batch of independent updates as one logical user action.
    /// A single undo reverts the entire batch.
    pub fn update_many(
        &mut self,
        updates: Vec<(Uuid, TaskPatch)>,
        parser: &dyn DateParser,
        now: DateTime<Local>,
    ) -> usize {
        let now_utc = now.with_timezone(&Utc);
        let mut before: Vec<Task> = Vec::new();

        for (id, patch) in updates {
            let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
                trace!(%id, "update_many: id not found, ignoring");
                continue;
            };
            before.push(self.tasks[index].clone());
            apply_patch(&mut self.tasks[index], patch, parser, now, now_utc);
        }

        let applied = before.len();
        if applied > 0 {
            self.undo.record(UndoAction::CompleteMany { before }, now_utc);
        }
        applied
    }

    /// Remove the given tasks. Unknown ids are skipped silently.
    pub fn delete(&mut self, ids: &[Uuid], now: DateTime<Local>) -> usize {
        let now_utc = now.with_timezone(&Utc);
        let removed = self.remove_by_ids(ids);

        match removed.len() {
            0 => 0,
            1 => {
                if let Some((index, task)) = removed.into_iter().next() {
                    debug!(id = %task.id, "delete task");
                    self.undo.record(UndoAction::Delete { index, task }, now_utc);
                }
                1
            }
            n => {
                debug!(count = n, "delete tasks");
                self.undo
                    .record(UndoAction::DeleteMany { tasks: removed }, now_utc);
                n
            }
        }
    }

    /// Set the completed flag for each listed id, refreshing `last_updated`.
    pub fn set_completed(&mut self, ids: &[Uuid], completed: bool, now: DateTime<Local>) -> usize {
        let now_utc = now.with_timezone(&Utc);
        let mut before: Vec<Task> = Vec::new();

        for id in ids {
            let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) else {
                trace!(%id, "set_completed: id not found, ignoring");
                continue;
            };
            before.push(task.clone());
            task.completed = completed;
            task.touch(now_utc);
        }

        let touched = before.len();
        if touched > 0 {
            debug!(count = touched, completed, "set completed");
            self.undo.record(UndoAction::CompleteMany { before }, now_utc);
        }
        touched
    }

    /// Delete every task whose due date is strictly before the start of
    /// `now`'s calendar day. Purely date-based: completed tasks are eligible
    /// too (the `overdue` status filter is the stricter notion).
    pub fn delete_overdue(&mut self, now: DateTime<Local>) -> usize {
        let today = now.date_naive();
        let ids: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|t| t.due_date.is_some_and(|d| d < today))
            .map(|t| t.id)
            .collect();

        if ids.is_empty() {
            return 0;
        }

        let now_utc = now.with_timezone(&Utc);
        let removed = self.remove_by_ids(&ids);
        let count = removed.len();
        debug!(count, "delete overdue tasks");
        self.undo
            .record(UndoAction::DeleteMany { tasks: removed }, now_utc);
        count
    }

    pub fn delete_all(&mut self, now: DateTime<Local>) {
        if self.tasks.is_empty() {
            return;
        }
        let now_utc = now.with_timezone(&Utc);
        let tasks: Vec<(usize, Task)> = self.tasks.drain(..).enumerate().collect();
        debug!(count = tasks.len(), "delete all tasks");
        self.undo.record(UndoAction::DeleteMany { tasks }, now_utc);
    }

    /// Invert the mutation in the undo slot, then clear it. No-op when the
    /// slot is empty. Returns whether anything was reverted.
    pub fn revert_last(&mut self) -> bool {
        let Some(action) = self.undo.take() else {
            return false;
        };
        debug!(kind = action.kind(), "revert last mutation");

        match action {
            UndoAction::Add { id } => {
                self.tasks.retain(|t| t.id != id);
            }
            UndoAction::Delete { index, task } => {
                self.reinsert(index, task);
            }
            UndoAction::Update { before } => {
                self.restore(before);
            }
            UndoAction::DeleteMany { mut tasks } => {
                tasks.sort_by_key(|(index, _)| *index);
                for (index, task) in tasks {
                    self.reinsert(index, task);
                }
            }
            UndoAction::CompleteMany { before } => {
                for snapshot in before {
                    self.restore(snapshot);
                }
            }
        }
        true
    }

    /// Stable ordered view. Due-date ascending puts tasks without a due
    /// date last; both priority orders put unprioritized tasks last.
    pub fn sorted(&self, key: SortKey) -> Vec<Task> {
        let mut view = self.tasks.clone();
        match key {
            SortKey::CreatedDesc => view.sort_by_key(|t| Reverse(t.created_at)),
            SortKey::DueDateAsc => view.sort_by_key(|t| (t.due_date.is_none(), t.due_date)),
            SortKey::UpdatedDesc => view.sort_by_key(|t| Reverse(t.last_updated)),
            SortKey::PriorityHighFirst => {
                view.sort_by_key(|t| t.priority.map(|p| p.rank()).unwrap_or(3))
            }
            SortKey::PriorityLowFirst => {
                view.sort_by_key(|t| t.priority.map(|p| 2 - p.rank()).unwrap_or(3))
            }
        }
        view
    }

    fn remove_by_ids(&mut self, ids: &[Uuid]) -> Vec<(usize, Task)> {
        let mut removed: Vec<(usize, Task)> = Vec::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if ids.contains(&task.id) {
                removed.push((index, task.clone()));
            }
        }
        let drop_ids: Vec<Uuid> = removed.iter().map(|(_, t)| t.id).collect();
        self.tasks.retain(|t| !drop_ids.contains(&t.id));
        removed
    }

    fn reinsert(&mut self, index: usize, task: Task) {
        let at = index.min(self.tasks.len());
        self.tasks.insert(at, task);
    }

    fn restore(&mut self, snapshot: Task) {
        match self.tasks.iter_mut().find(|t| t.id == snapshot.id) {
            Some(task) => *task = snapshot,
            None => self.tasks.push(snapshot),
        }
    }
}

fn apply_patch(
    task: &mut Task,
    patch: TaskPatch,
    parser: &dyn DateParser,
    now: DateTime<Local>,
    now_utc: DateTime<Utc>,
) {
    if let Some(text) = patch.text
        && !text.trim().is_empty()
    {
        task.text = text;
    }
    if let Some(priority) = patch.priority {
        task.priority = Some(priority);
    }
    if let Some(location) = patch.location {
        task.location = if location.trim().is_empty() {
            None
        } else {
            Some(location)
        };
    }
    match patch.due {
        Some(DueChange::Date(date)) => task.due_date = Some(date),
        Some(DueChange::Clear) => task.due_date = None,
        Some(DueChange::Text(text)) => {
            // An expression that fails to parse leaves the old date alone.
            if let Some(when) = parser.parse_date(&text, now) {
                task.due_date = Some(when.date_naive());
            }
        }
        None => {}
    }
    task.touch(now_utc);
}
