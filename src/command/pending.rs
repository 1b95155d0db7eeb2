use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::intent::{Action, TaskUpdates};
use crate::task::Task;

use super::outcome::{ActionCounters, PendingRequest};

/// The store mutation a suspended batch will perform if the caller says yes.
///
/// `UpdateIds` keeps the raw updates rather than precomputed patches:
/// relative date shifts are applied against each task's own due date at
/// confirmation time, so an earlier resume cannot act on stale dates.
#[derive(Debug, Clone, PartialEq)]
pub enum GatedApply {
    DeleteIds(Vec<Uuid>),
    DeleteOverdue,
    DeleteAll,
    UpdateIds { ids: Vec<Uuid>, updates: TaskUpdates },
    CompleteSelect { candidates: Vec<Uuid> },
}

/// A command batch frozen at a confirmation point.
///
/// Captures what to do on yes, everything still queued behind the gated
/// action, and the running tallies, so resumption continues the batch
/// exactly where it paused. The batch's captured `now` carries over to
/// keep date comparisons consistent across the pause.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub request: PendingRequest,
    pub gated: GatedApply,
    pub rest: Vec<Action>,
    pub counters: ActionCounters,
    pub notices: Vec<String>,
    pub shown: Option<Vec<Task>>,
    pub transcript: String,
    pub now: DateTime<Local>,
}
