//! The command orchestrator: interprets an ordered action list from the
//! intent service against current store state.
//!
//! One voice command is one batch. Actions apply strictly in order, so a
//! later action sees the effects of earlier ones. Destructive or bulk
//! actions suspend the batch behind an explicit confirmation value;
//! resumption happens through [`Engine::confirm`] and [`Engine::select`],
//! never through blocking waits.

use chrono::{DateTime, Duration, Local, Months, NaiveDate};
use std::collections::VecDeque;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::dates::{DateParser, NaturalDateParser};
use crate::intent::{Action, DueShift, Filter, NewTask, QueryKind, TaskUpdates};
use crate::resolve::{match_topic, resolve_positions, ResolveContext};
use crate::task::{
    detect_priority, DueChange, Priority, SortKey, Task, TaskDraft, TaskPatch, TaskStore,
};

use super::outcome::{
    empty_view_message, ActionCounters, CommandOutcome, PendingRequest, SelectOption,
};
use super::pending::{GatedApply, PendingCommand};

/// Running state of one batch while its actions are interpreted.
struct Batch {
    queue: VecDeque<Action>,
    counters: ActionCounters,
    notices: Vec<String>,
    shown: Option<Vec<Task>>,
    transcript: String,
    now: DateTime<Local>,
}

impl Batch {
    fn new(actions: Vec<Action>, transcript: &str, now: DateTime<Local>) -> Self {
        Self {
            queue: VecDeque::from(actions),
            counters: ActionCounters::default(),
            notices: Vec::new(),
            shown: None,
            transcript: transcript.to_string(),
            now,
        }
    }

    fn resume(pending: PendingCommand) -> Self {
        Self {
            queue: VecDeque::from(pending.rest),
            counters: pending.counters,
            notices: pending.notices,
            shown: pending.shown,
            transcript: pending.transcript,
            now: pending.now,
        }
    }
}

/// Serialized command path over the task store.
///
/// The engine owns the store, the active sort criterion, and at most one
/// suspended batch. All mutations go through store operations; the engine
/// itself never touches task fields.
pub struct Engine {
    store: TaskStore,
    config: Config,
    parser: Box<dyn DateParser>,
    sort_key: SortKey,
    pending: Option<PendingCommand>,
}

impl Engine {
    pub fn new(store: TaskStore, config: Config) -> Self {
        Self::with_parser(store, config, Box::new(NaturalDateParser::new()))
    }

    pub fn with_parser(store: TaskStore, config: Config, parser: Box<dyn DateParser>) -> Self {
        Self {
            store,
            config,
            parser,
            sort_key: SortKey::default(),
            pending: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    /// Tasks in the order the user currently sees them.
    pub fn display(&self) -> Vec<Task> {
        self.store.sorted(self.sort_key)
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    /// Interpret one action batch against current state.
    pub fn submit(&mut self, actions: Vec<Action>, transcript: &str) -> CommandOutcome {
        self.submit_at(actions, transcript, Local::now())
    }

    /// Like [`submit`], with an explicit "now" captured once for the whole
    /// batch so every date comparison within it agrees.
    ///
    /// [`submit`]: Engine::submit
    pub fn submit_at(
        &mut self,
        actions: Vec<Action>,
        transcript: &str,
        now: DateTime<Local>,
    ) -> CommandOutcome {
        self.store.expire_undo(now, self.config.undo_ttl_secs);

        let mut batch = Batch::new(actions, transcript, now);
        if self.pending.take().is_some() {
            batch
                .notices
                .push("The earlier confirmation was cancelled.".to_string());
        }
        if batch.queue.is_empty() {
            batch
                .notices
                .push("I didn't catch a command in that.".to_string());
        }

        info!(actions = batch.queue.len(), "interpret command batch");
        self.run(batch)
    }

    /// Resume a suspended batch with a yes/no answer. On a multi-select
    /// suspension, yes means "all of them".
    pub fn confirm(&mut self, accept: bool) -> CommandOutcome {
        let Some(pending) = self.pending.take() else {
            return CommandOutcome::notice("There's nothing waiting for confirmation.");
        };

        let gated = pending.gated.clone();
        let mut batch = Batch::resume(pending);
        if accept {
            self.apply_gated(gated, &mut batch);
        } else {
            batch.notices.push("Okay, cancelled.".to_string());
        }
        self.run(batch)
    }

    /// Resume a suspended multi-select with the chosen task ids.
    pub fn select(&mut self, chosen: &[Uuid]) -> CommandOutcome {
        match &self.pending {
            Some(p) if matches!(p.gated, GatedApply::CompleteSelect { .. }) => {}
            Some(_) => {
                return CommandOutcome::notice("A yes/no confirmation is pending; answer that first.");
            }
            None => return CommandOutcome::notice("There's nothing waiting for a selection."),
        }
        let Some(pending) = self.pending.take() else {
            return CommandOutcome::notice("There's nothing waiting for a selection.");
        };

        let GatedApply::CompleteSelect { candidates } = pending.gated.clone() else {
            return CommandOutcome::notice("There's nothing waiting for a selection.");
        };
        let mut batch = Batch::resume(pending);

        let picked: Vec<Uuid> = candidates
            .into_iter()
            .filter(|id| chosen.contains(id))
            .collect();
        if picked.is_empty() {
            batch
                .notices
                .push("No tasks selected; nothing changed.".to_string());
        } else {
            let n = self.store.set_completed(&picked, true, batch.now);
            batch.counters.completed += n as u32;
            batch.notices.push(format!("Completed {} task(s).", n));
        }
        self.run(batch)
    }

    /// Revert the last mutation if the undo slot is still live.
    pub fn undo_at(&mut self, now: DateTime<Local>) -> bool {
        self.store.expire_undo(now, self.config.undo_ttl_secs);
        self.store.revert_last()
    }

    pub fn undo(&mut self) -> bool {
        self.undo_at(Local::now())
    }

    pub fn into_store(self) -> TaskStore {
        self.store
    }

    fn run(&mut self, mut batch: Batch) -> CommandOutcome {
        while let Some(action) = batch.queue.pop_front() {
            if let Some((request, gated)) = self.apply_action(action, &mut batch) {
                debug!("batch suspended pending user decision");
                self.pending = Some(PendingCommand {
                    request: request.clone(),
                    gated,
                    rest: batch.queue.into_iter().collect(),
                    counters: batch.counters,
                    notices: batch.notices.clone(),
                    shown: batch.shown.clone(),
                    transcript: batch.transcript,
                    now: batch.now,
                });
                return CommandOutcome {
                    notices: batch.notices,
                    shown: batch.shown,
                    pending: Some(request),
                    counters: batch.counters,
                    summary: "Waiting for your confirmation.".to_string(),
                };
            }
        }
        self.finalize(batch)
    }

    fn finalize(&self, batch: Batch) -> CommandOutcome {
        let mut notices = batch.notices;
        if !batch.counters.any_effect()
            && batch.counters.unknown > 0
            && notices.is_empty()
            && batch.shown.is_none()
        {
            notices.push("I couldn't understand that. Please try rephrasing.".to_string());
        }
        CommandOutcome {
            summary: batch.counters.summary(),
            notices,
            shown: batch.shown,
            pending: None,
            counters: batch.counters,
        }
    }

    /// Apply one action. Returns `Some` when the batch must suspend for a
    /// user decision.
    fn apply_action(
        &mut self,
        action: Action,
        batch: &mut Batch,
    ) -> Option<(PendingRequest, GatedApply)> {
        match action {
            Action::AddTask { tasks } => {
                self.handle_add(tasks, batch);
                None
            }
            Action::DeleteTask { filter } => self.handle_delete(&filter, batch),
            Action::UpdateTask { filter, updates } => self.handle_update(&filter, updates, batch),
            Action::MarkCompleted { filter } => self.handle_mark_completed(&filter, batch),
            Action::MarkIncomplete { filter } => {
                self.handle_mark_incomplete(&filter, batch);
                None
            }
            Action::DeleteAll => self.handle_delete_all(batch),
            Action::DeleteOverdue => self.handle_delete_overdue(batch),
            Action::SortBy { key } => {
                self.sort_key = key;
                batch.notices.push(format!("Sorted by {}.", key));
                None
            }
            Action::ShowTasks { filter } => {
                self.handle_show(&filter, batch);
                None
            }
            Action::QueryTaskInfo { filter, query } => {
                self.handle_query(&filter, query, batch);
                None
            }
            Action::Unknown => {
                batch.counters.unknown += 1;
                None
            }
        }
    }

    fn resolve_filter(&self, filter: &Filter, now: DateTime<Local>) -> Vec<Uuid> {
        let display = self.store.sorted(self.sort_key);
        let context = ResolveContext {
            synonyms: &self.config.synonyms,
            parser: self.parser.as_ref(),
            now,
        };
        context.resolve(self.store.tasks(), &display, filter)
    }

    fn handle_add(&mut self, tasks: Vec<NewTask>, batch: &mut Batch) {
        for proposed in tasks {
            let incomplete: Vec<Task> = self
                .store
                .tasks()
                .iter()
                .filter(|t| !t.completed)
                .cloned()
                .collect();
            let matches = match_topic(&incomplete, &proposed.text, &self.config.synonyms);

            if let Some(existing_id) = matches.first().copied() {
                if !proposed.has_detail() {
                    let existing = self
                        .store
                        .get(existing_id)
                        .map(|t| t.text.clone())
                        .unwrap_or_else(|| proposed.text.clone());
                    batch
                        .notices
                        .push(format!("\"{}\" is already on the list.", existing));
                    batch.counters.duplicates += 1;
                    continue;
                }

                // Detail on a near-duplicate reads as "that task, but with
                // this date/priority/place": update the best match instead
                // of adding a twin.
                let patch = TaskPatch {
                    priority: proposed.priority,
                    due: proposed.due_text.clone().map(DueChange::Text),
                    location: proposed.location.clone(),
                    ..Default::default()
                };
                self.store
                    .update(existing_id, patch, self.parser.as_ref(), batch.now);
                let text = self
                    .store
                    .get(existing_id)
                    .map(|t| t.text.clone())
                    .unwrap_or_else(|| proposed.text.clone());
                batch.counters.updated += 1;
                batch
                    .notices
                    .push(format!("Updated the existing task \"{}\".", text));
                continue;
            }

            let priority = proposed.priority.or_else(|| {
                let hint = detect_priority(
                    &proposed.text,
                    &self.config.keywords,
                    self.parser.as_ref(),
                    batch.now,
                );
                hint.priority.or_else(|| {
                    if batch.transcript.trim().is_empty() {
                        None
                    } else {
                        detect_priority(
                            &batch.transcript,
                            &self.config.keywords,
                            self.parser.as_ref(),
                            batch.now,
                        )
                        .priority
                    }
                })
            });

            let due_date = proposed
                .due_text
                .as_deref()
                .and_then(|expr| self.parser.parse_date(expr, batch.now))
                .or_else(|| {
                    if proposed.due_text.is_none() && !batch.transcript.trim().is_empty() {
                        self.parser.parse_date(&batch.transcript, batch.now)
                    } else {
                        None
                    }
                })
                .map(|dt| dt.date_naive());

            let task = self.store.create(
                TaskDraft {
                    text: proposed.text,
                    priority,
                    due_date,
                    location: proposed.location,
                },
                batch.now,
            );
            batch.counters.added += 1;
            batch.notices.push(format!("Added \"{}\".", task.text));
        }
    }

    fn handle_delete(
        &mut self,
        filter: &Filter,
        batch: &mut Batch,
    ) -> Option<(PendingRequest, GatedApply)> {
        if filter.is_empty() {
            batch
                .notices
                .push("Tell me which task to delete.".to_string());
            batch.counters.misses += 1;
            return None;
        }

        let ids = self.resolve_filter(filter, batch.now);
        match ids.len() {
            0 => {
                batch
                    .notices
                    .push("No matching tasks to delete.".to_string());
                batch.counters.misses += 1;
                None
            }
            1 => {
                let task = self.store.get(ids[0])?.clone();
                if task.priority == Some(Priority::High) {
                    return Some((
                        PendingRequest::Confirm {
                            prompt: format!("Delete the high priority task \"{}\"?", task.text),
                        },
                        GatedApply::DeleteIds(ids),
                    ));
                }
                self.store.delete(&ids, batch.now);
                batch.counters.deleted += 1;
                batch.notices.push(format!("Deleted \"{}\".", task.text));
                None
            }
            n => Some((
                PendingRequest::Confirm {
                    prompt: format!("Delete {} matching tasks?", n),
                },
                GatedApply::DeleteIds(ids),
            )),
        }
    }

    fn handle_delete_overdue(&mut self, batch: &mut Batch) -> Option<(PendingRequest, GatedApply)> {
        let today = batch.now.date_naive();
        let count = self
            .store
            .tasks()
            .iter()
            .filter(|t| t.due_date.is_some_and(|d| d < today))
            .count();
        if count == 0 {
            batch
                .notices
                .push("No overdue tasks to delete.".to_string());
            return None;
        }
        Some((
            PendingRequest::Confirm {
                prompt: format!("Delete {} overdue task(s)?", count),
            },
            GatedApply::DeleteOverdue,
        ))
    }

    fn handle_delete_all(&mut self, batch: &mut Batch) -> Option<(PendingRequest, GatedApply)> {
        if self.store.is_empty() {
            batch
                .notices
                .push("The list is already empty.".to_string());
            return None;
        }
        Some((
            PendingRequest::Confirm {
                prompt: format!("Delete all {} tasks?", self.store.len()),
            },
            GatedApply::DeleteAll,
        ))
    }

    fn handle_mark_completed(
        &mut self,
        filter: &Filter,
        batch: &mut Batch,
    ) -> Option<(PendingRequest, GatedApply)> {
        // Positions first, then text among incomplete tasks, then the
        // general filter.
        let ids: Vec<Uuid> = if !filter.positions.is_empty() {
            let display = self.store.sorted(self.sort_key);
            resolve_positions(&filter.positions, &display)
        } else if let Some(topic) = &filter.topic {
            let incomplete: Vec<Task> = self
                .store
                .tasks()
                .iter()
                .filter(|t| !t.completed)
                .cloned()
                .collect();
            match_topic(&incomplete, topic, &self.config.synonyms)
        } else {
            self.resolve_filter(filter, batch.now)
        };

        match ids.len() {
            0 => {
                batch
                    .notices
                    .push("No matching task to complete.".to_string());
                batch.counters.misses += 1;
                None
            }
            1 => {
                self.store.set_completed(&ids, true, batch.now);
                let text = self
                    .store
                    .get(ids[0])
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                batch.counters.completed += 1;
                batch.notices.push(format!("Completed \"{}\".", text));
                None
            }
            n => {
                let options: Vec<SelectOption> = ids
                    .iter()
                    .filter_map(|id| self.store.get(*id))
                    .map(|t| SelectOption {
                        id: t.id,
                        label: t.text.clone(),
                    })
                    .collect();
                Some((
                    PendingRequest::Select {
                        prompt: format!("{} tasks match. Which ones are done?", n),
                        options,
                    },
                    GatedApply::CompleteSelect { candidates: ids },
                ))
            }
        }
    }

    fn handle_mark_incomplete(&mut self, filter: &Filter, batch: &mut Batch) {
        let ids = self.resolve_filter(filter, batch.now);
        if ids.is_empty() {
            // Soft failure: counted, not surfaced individually.
            batch.counters.unknown += 1;
            return;
        }
        let n = self.store.set_completed(&ids, false, batch.now);
        batch.counters.reopened += n as u32;
        batch.notices.push(format!("Reopened {} task(s).", n));
    }

    fn handle_update(
        &mut self,
        filter: &Filter,
        updates: TaskUpdates,
        batch: &mut Batch,
    ) -> Option<(PendingRequest, GatedApply)> {
        if updates.is_empty() {
            batch.notices.push("No changes specified.".to_string());
            batch.counters.misses += 1;
            return None;
        }

        let ids = self.resolve_filter(filter, batch.now);
        match ids.len() {
            0 => {
                batch
                    .notices
                    .push("No matching tasks to update.".to_string());
                batch.counters.misses += 1;
                None
            }
            1 => {
                let patch = self.patch_for(ids[0], &updates, batch.now);
                self.store
                    .update(ids[0], patch, self.parser.as_ref(), batch.now);
                let text = self
                    .store
                    .get(ids[0])
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                batch.counters.updated += 1;
                batch.notices.push(format!("Updated \"{}\".", text));
                None
            }
            // Never silently bulk-update: two or more matches always go
            // through a plain confirm.
            n => Some((
                PendingRequest::Confirm {
                    prompt: format!("Apply this update to {} tasks?", n),
                },
                GatedApply::UpdateIds { ids, updates },
            )),
        }
    }

    /// Translate upstream updates into a per-task patch. Relative shifts
    /// move each task's own due date, or start from today when it has none.
    fn patch_for(&self, id: Uuid, updates: &TaskUpdates, now: DateTime<Local>) -> TaskPatch {
        let due = if let Some(shift) = updates.due_shift.filter(|s| !s.is_zero()) {
            let base = self
                .store
                .get(id)
                .and_then(|t| t.due_date)
                .unwrap_or_else(|| now.date_naive());
            Some(DueChange::Date(apply_shift(base, shift)))
        } else if updates.clear_due {
            Some(DueChange::Clear)
        } else {
            updates.due_text.clone().map(DueChange::Text)
        };

        TaskPatch {
            text: updates.text.clone(),
            priority: updates.priority,
            due,
            location: updates.location.clone(),
        }
    }

    fn handle_show(&mut self, filter: &Filter, batch: &mut Batch) {
        let display = self.store.sorted(self.sort_key);
        if filter.is_empty() {
            batch.shown = Some(display);
            return;
        }

        let ids = self.resolve_filter(filter, batch.now);
        if ids.is_empty() {
            batch.notices.push(empty_view_message(filter));
            return;
        }
        batch.shown = Some(
            display
                .into_iter()
                .filter(|t| ids.contains(&t.id))
                .collect(),
        );
    }

    fn handle_query(&mut self, filter: &Filter, query: QueryKind, batch: &mut Batch) {
        let ids = self.resolve_filter(filter, batch.now);

        if query == QueryKind::Count {
            batch.notices.push(format!("{} task(s) match.", ids.len()));
            return;
        }

        match ids.len() {
            0 => {
                batch.notices.push("No matching task.".to_string());
                batch.counters.misses += 1;
            }
            1 => {
                if let Some(task) = self.store.get(ids[0]) {
                    batch.notices.push(query_answer(task, query));
                }
            }
            n => {
                batch.notices.push(format!(
                    "That could be {} different tasks. Please be more specific.",
                    n
                ));
            }
        }
    }

    fn apply_gated(&mut self, gated: GatedApply, batch: &mut Batch) {
        match gated {
            GatedApply::DeleteIds(ids) => {
                let n = self.store.delete(&ids, batch.now);
                batch.counters.deleted += n as u32;
                batch.notices.push(format!("Deleted {} task(s).", n));
            }
            GatedApply::DeleteOverdue => {
                let n = self.store.delete_overdue(batch.now);
                batch.counters.deleted += n as u32;
                batch
                    .notices
                    .push(format!("Deleted {} overdue task(s).", n));
            }
            GatedApply::DeleteAll => {
                let n = self.store.len();
                self.store.delete_all(batch.now);
                batch.counters.deleted += n as u32;
                batch.notices.push(format!("Deleted all {} tasks.", n));
            }
            GatedApply::UpdateIds { ids, updates } => {
                let patches: Vec<(Uuid, TaskPatch)> = ids
                    .iter()
                    .map(|id| (*id, self.patch_for(*id, &updates, batch.now)))
                    .collect();
                let n = self
                    .store
                    .update_many(patches, self.parser.as_ref(), batch.now);
                batch.counters.updated += n as u32;
                batch.notices.push(format!("Updated {} task(s).", n));
            }
            GatedApply::CompleteSelect { candidates } => {
                let n = self.store.set_completed(&candidates, true, batch.now);
                batch.counters.completed += n as u32;
                batch.notices.push(format!("Completed {} task(s).", n));
            }
        }
    }
}

fn apply_shift(base: NaiveDate, shift: DueShift) -> NaiveDate {
    let mut date = base + Duration::days(shift.days + shift.weeks * 7);
    if shift.months > 0 {
        date = date
            .checked_add_months(Months::new(shift.months as u32))
            .unwrap_or(date);
    } else if shift.months < 0 {
        date = date
            .checked_sub_months(Months::new(shift.months.unsigned_abs()))
            .unwrap_or(date);
    }
    date
}

fn query_answer(task: &Task, query: QueryKind) -> String {
    match query {
        QueryKind::Count => format!("1 task matches: \"{}\".", task.text),
        QueryKind::DueDate => match task.due_date {
            Some(due) => format!("\"{}\" is due {}.", task.text, due.format("%B %d, %Y")),
            None => format!("\"{}\" has no due date.", task.text),
        },
        QueryKind::Priority => match task.priority {
            Some(p) => format!("\"{}\" is {} priority.", task.text, p),
            None => format!("\"{}\" has no priority set.", task.text),
        },
        QueryKind::Location => match &task.location {
            Some(l) => format!("\"{}\" is at {}.", task.text, l),
            None => format!("\"{}\" has no location.", task.text),
        },
        QueryKind::Details => {
            let mut parts = vec![format!("\"{}\"", task.text)];
            if task.completed {
                parts.push("completed".to_string());
            }
            if let Some(due) = task.due_date {
                parts.push(format!("due {}", due.format("%B %d, %Y")));
            }
            if let Some(p) = task.priority {
                parts.push(format!("{} priority", p));
            }
            if let Some(l) = &task.location {
                parts.push(format!("at {}", l));
            }
            format!("{}.", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{PositionRef, StatusFilter};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> Engine {
        Engine::new(TaskStore::new(), Config::default())
    }

    fn add(texts: &[&str]) -> Vec<Action> {
        vec![Action::AddTask {
            tasks: texts.iter().map(|t| NewTask::new(*t)).collect(),
        }]
    }

    #[test]
    fn test_add_two_descriptors() {
        let mut engine = engine();
        let actions = vec![Action::AddTask {
            tasks: vec![
                NewTask::new("Buy milk"),
                NewTask {
                    location: Some("home".into()),
                    ..NewTask::new("Call mom")
                },
            ],
        }];
        let outcome = engine.submit_at(actions, "", now());

        assert_eq!(outcome.counters.added, 2);
        assert_eq!(engine.store().len(), 2);
        let second = &engine.store().tasks()[1];
        assert_eq!(second.text, "Call mom");
        assert_eq!(second.location.as_deref(), Some("home"));
        // Last add wins the single undo slot.
        assert_eq!(engine.store().undo_slot().kind(), Some("add"));
        assert!(engine.undo_at(now()));
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().tasks()[0].text, "Buy milk");
    }

    #[test]
    fn test_add_duplicate_without_detail_is_skipped() {
        let mut engine = engine();
        engine.submit_at(add(&["Buy milk"]), "", now());
        let outcome = engine.submit_at(add(&["buy milk"]), "", now());

        assert_eq!(outcome.counters.added, 0);
        assert_eq!(outcome.counters.duplicates, 1);
        assert_eq!(engine.store().len(), 1);
        assert!(outcome.notices[0].contains("already"));
    }

    #[test]
    fn test_add_duplicate_with_detail_updates_existing() {
        let mut engine = engine();
        engine.submit_at(add(&["Buy milk"]), "", now());
        let id = engine.store().tasks()[0].id;

        let actions = vec![Action::AddTask {
            tasks: vec![NewTask {
                priority: Some(Priority::High),
                due_text: Some("tomorrow".into()),
                ..NewTask::new("buy milk")
            }],
        }];
        let outcome = engine.submit_at(actions, "", now());

        assert_eq!(outcome.counters.added, 0);
        assert_eq!(outcome.counters.updated, 1);
        assert_eq!(engine.store().len(), 1);
        let task = engine.store().get(id).unwrap();
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.due_date, Some(date(2024, 1, 16)));
    }

    #[test]
    fn test_add_infers_priority_from_urgent_keyword() {
        let mut engine = engine();
        engine.submit_at(add(&["urgent: pay rent"]), "urgent: pay rent", now());
        assert_eq!(engine.store().tasks()[0].priority, Some(Priority::High));
    }

    #[test]
    fn test_add_derives_due_from_transcript_fallback() {
        let mut engine = engine();
        engine.submit_at(add(&["water the plants"]), "add water the plants for tomorrow", now());
        assert_eq!(
            engine.store().tasks()[0].due_date,
            Some(date(2024, 1, 16))
        );
    }

    #[test]
    fn test_delete_single_plain_is_immediate() {
        let mut engine = engine();
        engine.submit_at(add(&["Buy milk", "Walk dog"]), "", now());

        let outcome = engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_topic("milk"),
            }],
            "",
            now(),
        );
        assert!(outcome.pending.is_none());
        assert_eq!(outcome.counters.deleted, 1);
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_delete_high_priority_requires_confirmation() {
        let mut engine = engine();
        engine.submit_at(add(&["urgent: file taxes"]), "", now());
        assert_eq!(engine.store().tasks()[0].priority, Some(Priority::High));

        let outcome = engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_topic("taxes"),
            }],
            "",
            now(),
        );
        assert!(matches!(outcome.pending, Some(PendingRequest::Confirm { .. })));
        assert_eq!(engine.store().len(), 1, "nothing deleted before confirm");

        let outcome = engine.confirm(true);
        assert_eq!(outcome.counters.deleted, 1);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_delete_confirmation_declined() {
        let mut engine = engine();
        engine.submit_at(add(&["a", "ab"]), "", now());

        let outcome = engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_topic("a"),
            }],
            "",
            now(),
        );
        assert!(outcome.pending.is_some(), "two matches need a confirm");

        let outcome = engine.confirm(false);
        assert_eq!(outcome.counters.deleted, 0);
        assert_eq!(engine.store().len(), 2);
        assert!(outcome.notices.iter().any(|n| n.contains("cancelled")));
    }

    #[test]
    fn test_delete_no_match_is_soft() {
        let mut engine = engine();
        engine.submit_at(add(&["a"]), "", now());
        let outcome = engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_topic("zzz"),
            }],
            "",
            now(),
        );
        assert_eq!(outcome.counters.misses, 1);
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_delete_overdue_confirm_and_undo() {
        let mut engine = engine();
        let actions = vec![Action::AddTask {
            tasks: vec![NewTask {
                due_text: Some("2024-01-10".into()),
                ..NewTask::new("old chore")
            }],
        }];
        engine.submit_at(actions, "", now());
        let original = engine.store().tasks()[0].clone();
        assert_eq!(original.due_date, Some(date(2024, 1, 10)));

        let outcome = engine.submit_at(vec![Action::DeleteOverdue], "", now());
        assert!(matches!(outcome.pending, Some(PendingRequest::Confirm { .. })));

        let outcome = engine.confirm(true);
        assert_eq!(outcome.counters.deleted, 1);
        assert!(engine.store().is_empty());

        assert!(engine.undo_at(now()));
        let restored = &engine.store().tasks()[0];
        assert_eq!(restored.id, original.id);
        assert_eq!(restored.due_date, original.due_date);
        assert_eq!(restored.priority, original.priority);
    }

    #[test]
    fn test_delete_overdue_none_notifies() {
        let mut engine = engine();
        engine.submit_at(add(&["future stuff"]), "", now());
        let outcome = engine.submit_at(vec![Action::DeleteOverdue], "", now());
        assert!(outcome.pending.is_none());
        assert!(outcome.notices.iter().any(|n| n.contains("No overdue")));
    }

    #[test]
    fn test_delete_all_empty_store_notifies() {
        let mut engine = engine();
        let outcome = engine.submit_at(vec![Action::DeleteAll], "", now());
        assert!(outcome.pending.is_none());
        assert!(outcome.notices.iter().any(|n| n.contains("already empty")));
    }

    #[test]
    fn test_delete_all_confirm() {
        let mut engine = engine();
        engine.submit_at(add(&["a", "b"]), "", now());
        let outcome = engine.submit_at(vec![Action::DeleteAll], "", now());
        assert!(outcome.pending.is_some());

        let outcome = engine.confirm(true);
        assert_eq!(outcome.counters.deleted, 2);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_mark_completed_single() {
        let mut engine = engine();
        engine.submit_at(add(&["Buy milk", "Walk dog"]), "", now());
        let outcome = engine.submit_at(
            vec![Action::MarkCompleted {
                filter: Filter::by_topic("milk"),
            }],
            "",
            now(),
        );
        assert_eq!(outcome.counters.completed, 1);
        assert!(engine.store().tasks()[0].completed);
    }

    #[test]
    fn test_mark_completed_multi_goes_through_selection() {
        let mut engine = engine();
        engine.submit_at(add(&["call alice", "call bob", "email carol"]), "", now());

        let outcome = engine.submit_at(
            vec![Action::MarkCompleted {
                filter: Filter::by_topic("call"),
            }],
            "",
            now(),
        );
        let Some(PendingRequest::Select { options, .. }) = &outcome.pending else {
            panic!("expected a selection request, got {:?}", outcome.pending);
        };
        assert_eq!(options.len(), 2);

        let chosen = vec![options[0].id];
        let outcome = engine.select(&chosen);
        assert_eq!(outcome.counters.completed, 1);
        assert!(engine.store().get(chosen[0]).unwrap().completed);
        assert!(!engine.store().tasks()[1].completed);
    }

    #[test]
    fn test_mark_completed_by_position_uses_display_order() {
        let mut engine = engine();
        // Distinct creation instants so the created-desc display order is
        // the reverse of creation order.
        engine.submit_at(add(&["first"]), "", now());
        engine.submit_at(add(&["second"]), "", now() + Duration::seconds(1));
        engine.submit_at(add(&["third"]), "", now() + Duration::seconds(2));

        let outcome = engine.submit_at(
            vec![Action::MarkCompleted {
                filter: Filter::by_positions(vec![PositionRef::Index(1)]),
            }],
            "",
            now() + Duration::seconds(3),
        );
        assert_eq!(outcome.counters.completed, 1);
        assert!(engine.store().tasks()[2].completed, "display position 1 is the newest task");
    }

    #[test]
    fn test_mark_incomplete_zero_matches_counts_unknown() {
        let mut engine = engine();
        let outcome = engine.submit_at(
            vec![Action::MarkIncomplete {
                filter: Filter::by_topic("nothing"),
            }],
            "",
            now(),
        );
        assert_eq!(outcome.counters.unknown, 1);
    }

    #[test]
    fn test_update_shift_is_per_task() {
        let mut engine = engine();
        engine.submit_at(
            vec![Action::AddTask {
                tasks: vec![
                    NewTask {
                        due_text: Some("2024-01-20".into()),
                        ..NewTask::new("pay rent")
                    },
                    NewTask {
                        due_text: Some("2024-02-05".into()),
                        ..NewTask::new("car inspection")
                    },
                ],
            }],
            "",
            now(),
        );

        // Date-range bulk edit covering both tasks.
        let outcome = engine.submit_at(
            vec![Action::UpdateTask {
                filter: Filter {
                    due: Some("between 2024-01-20 and 2024-02-05".into()),
                    ..Default::default()
                },
                updates: TaskUpdates {
                    due_shift: Some(DueShift {
                        days: 3,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            }],
            "",
            now(),
        );
        assert!(outcome.pending.is_some(), "bulk update needs confirmation");

        let outcome = engine.confirm(true);
        assert_eq!(outcome.counters.updated, 2);
        // Each task shifted from its OWN prior due date.
        assert_eq!(engine.store().tasks()[0].due_date, Some(date(2024, 1, 23)));
        assert_eq!(engine.store().tasks()[1].due_date, Some(date(2024, 2, 8)));

        // One undo reverts the whole batch.
        assert!(engine.undo_at(now()));
        assert_eq!(engine.store().tasks()[0].due_date, Some(date(2024, 1, 20)));
        assert_eq!(engine.store().tasks()[1].due_date, Some(date(2024, 2, 5)));
    }

    #[test]
    fn test_update_shift_without_due_starts_today() {
        let mut engine = engine();
        engine.submit_at(add(&["dateless"]), "", now());
        engine.submit_at(
            vec![Action::UpdateTask {
                filter: Filter::by_topic("dateless"),
                updates: TaskUpdates {
                    due_shift: Some(DueShift {
                        weeks: 1,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            }],
            "",
            now(),
        );
        assert_eq!(engine.store().tasks()[0].due_date, Some(date(2024, 1, 22)));
    }

    #[test]
    fn test_later_action_sees_earlier_effects() {
        let mut engine = engine();
        let actions = vec![
            Action::AddTask {
                tasks: vec![NewTask::new("write report")],
            },
            Action::MarkCompleted {
                filter: Filter::by_topic("report"),
            },
        ];
        let outcome = engine.submit_at(actions, "", now());
        assert_eq!(outcome.counters.added, 1);
        assert_eq!(outcome.counters.completed, 1);
        assert!(engine.store().tasks()[0].completed);
    }

    #[test]
    fn test_show_tasks_filtered_and_empty_states() {
        let mut engine = engine();
        engine.submit_at(add(&["a", "b"]), "", now());

        let outcome = engine.submit_at(
            vec![Action::ShowTasks {
                filter: Filter::default(),
            }],
            "",
            now(),
        );
        assert_eq!(outcome.shown.as_ref().map(|s| s.len()), Some(2));

        let outcome = engine.submit_at(
            vec![Action::ShowTasks {
                filter: Filter::by_status(StatusFilter::Overdue),
            }],
            "",
            now(),
        );
        assert!(outcome.shown.is_none());
        assert!(outcome.notices.iter().any(|n| n.contains("overdue")));
    }

    #[test]
    fn test_show_is_idempotent() {
        let mut engine = engine();
        engine.submit_at(add(&["alpha", "beta"]), "", now());
        let filter = Filter::by_topic("a");

        let first = engine.submit_at(
            vec![Action::ShowTasks { filter: filter.clone() }],
            "",
            now(),
        );
        let second = engine.submit_at(
            vec![Action::ShowTasks { filter }],
            "",
            now(),
        );
        let ids = |o: &CommandOutcome| {
            o.shown
                .as_ref()
                .map(|tasks| tasks.iter().map(|t| t.id).collect::<Vec<_>>())
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_query_count_and_ambiguity() {
        let mut engine = engine();
        engine.submit_at(add(&["call alice", "call bob"]), "", now());

        let outcome = engine.submit_at(
            vec![Action::QueryTaskInfo {
                filter: Filter::by_topic("call"),
                query: QueryKind::Count,
            }],
            "",
            now(),
        );
        assert!(outcome.notices.iter().any(|n| n.contains("2 task(s)")));

        let outcome = engine.submit_at(
            vec![Action::QueryTaskInfo {
                filter: Filter::by_topic("call"),
                query: QueryKind::DueDate,
            }],
            "",
            now(),
        );
        assert!(outcome.notices.iter().any(|n| n.contains("more specific")));
    }

    #[test]
    fn test_unknown_only_yields_explanation() {
        let mut engine = engine();
        let outcome = engine.submit_at(vec![Action::Unknown], "", now());
        assert_eq!(outcome.counters.unknown, 1);
        assert!(!outcome.notices.is_empty());
        assert!(outcome.summary.contains("couldn't understand"));
    }

    #[test]
    fn test_empty_batch_notifies() {
        let mut engine = engine();
        let outcome = engine.submit_at(vec![], "", now());
        assert!(outcome.notices.iter().any(|n| n.contains("didn't catch")));
    }

    #[test]
    fn test_new_submission_cancels_stale_pending() {
        let mut engine = engine();
        engine.submit_at(add(&["a", "ab"]), "", now());
        engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_topic("a"),
            }],
            "",
            now(),
        );
        assert!(engine.pending_request().is_some());

        let outcome = engine.submit_at(add(&["c"]), "", now());
        assert!(engine.pending_request().is_none());
        assert!(outcome.notices.iter().any(|n| n.contains("cancelled")));
        assert_eq!(engine.store().len(), 3, "gated delete never ran");
    }

    #[test]
    fn test_confirm_with_nothing_pending() {
        let mut engine = engine();
        let outcome = engine.confirm(true);
        assert!(outcome.notices[0].contains("nothing waiting"));
    }

    #[test]
    fn test_sort_by_changes_display_order() {
        let mut engine = engine();
        engine.submit_at(
            vec![Action::AddTask {
                tasks: vec![
                    NewTask::new("plain"),
                    NewTask {
                        priority: Some(Priority::High),
                        ..NewTask::new("important")
                    },
                ],
            }],
            "",
            now(),
        );

        engine.submit_at(
            vec![Action::SortBy {
                key: SortKey::PriorityHighFirst,
            }],
            "",
            now(),
        );
        assert_eq!(engine.display()[0].text, "important");

        // Position 1 now refers to the high priority task.
        let outcome = engine.submit_at(
            vec![Action::DeleteTask {
                filter: Filter::by_positions(vec![PositionRef::Index(1)]),
            }],
            "",
            now(),
        );
        assert!(outcome.pending.is_some(), "high priority delete is gated");
        engine.confirm(true);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().tasks()[0].text, "plain");
    }

    #[test]
    fn test_batch_continues_after_confirmation() {
        let mut engine = engine();
        engine.submit_at(add(&["a", "ab"]), "", now());

        // Delete both (confirm gated), then add another task in the same
        // batch. The add must run only after the confirmation resolves.
        let actions = vec![
            Action::DeleteTask {
                filter: Filter::by_topic("a"),
            },
            Action::AddTask {
                tasks: vec![NewTask::new("next thing")],
            },
        ];
        let outcome = engine.submit_at(actions, "", now());
        assert!(outcome.pending.is_some());
        assert_eq!(engine.store().len(), 2, "queued add has not run yet");

        let outcome = engine.confirm(true);
        assert_eq!(outcome.counters.deleted, 2);
        assert_eq!(outcome.counters.added, 1);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().tasks()[0].text, "next thing");
    }

    #[test]
    fn test_apply_shift_months() {
        assert_eq!(
            apply_shift(date(2024, 1, 31), DueShift { months: 1, ..Default::default() }),
            date(2024, 2, 29)
        );
        assert_eq!(
            apply_shift(date(2024, 3, 15), DueShift { months: -1, ..Default::default() }),
            date(2024, 2, 15)
        );
    }
}
