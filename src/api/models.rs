use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::command::{ActionCounters, CommandOutcome, PendingRequest};
use crate::task::{Priority, Task};

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            priority: task.priority,
            due_date: task.due_date,
            location: task.location.clone(),
            created_at: task.created_at,
            last_updated: task.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
}

/// A command batch as received from the voice front end: the raw action
/// payload from the intent service plus the original transcript.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub actions: Value,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub summary: String,
    pub notices: Vec<String>,
    pub counters: ActionCounters,
    pub shown: Option<Vec<TaskResponse>>,
    pub pending: Option<PendingRequest>,
}

impl From<CommandOutcome> for OutcomeResponse {
    fn from(outcome: CommandOutcome) -> Self {
        Self {
            summary: outcome.summary,
            notices: outcome.notices,
            counters: outcome.counters,
            shown: outcome
                .shown
                .map(|tasks| tasks.iter().map(TaskResponse::from).collect()),
            pending: outcome.pending,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UndoResponse {
    pub reverted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn internal(e: impl std::fmt::Display) -> Response<Body> {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(Self::new(e.to_string()))).into_response()
    }

    pub fn bad_request(message: impl Into<String>) -> Response<Body> {
        (StatusCode::BAD_REQUEST, Json(Self::new(message))).into_response()
    }
}
