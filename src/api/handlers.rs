use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rusqlite::Connection;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

use crate::command::Engine;
use crate::intent::actions_from_value;
use crate::storage::{save_snapshot, Snapshot};
use crate::task::SortKey;

use super::models::{
    CommandRequest, ConfirmRequest, ErrorResponse, OutcomeResponse, SelectRequest, SortQuery,
    TaskListResponse, TaskResponse, UndoResponse,
};

/// Shared server state. The engine mutex serializes command batches: no
/// two batches ever interleave against the store.
pub struct AppState {
    pub engine: Mutex<Engine>,
    pub conn: Mutex<Connection>,
}

impl AppState {
    pub fn new(engine: Engine, conn: Connection) -> Self {
        Self {
            engine: Mutex::new(engine),
            conn: Mutex::new(conn),
        }
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, Engine>, String> {
        self.engine.lock().map_err(|_| "engine lock poisoned".to_string())
    }

    /// Write the current store back to disk. Persistence failures are
    /// logged but never fail the request: the in-memory state is already
    /// mutated and the response should reflect it.
    fn persist(&self, engine: &Engine) {
        let snapshot = Snapshot {
            tasks: engine.store().tasks().to_vec(),
            sort_key: engine.sort_key(),
            undo: engine.store().undo_slot().clone(),
        };
        match self.conn.lock() {
            Ok(conn) => {
                if let Err(e) = save_snapshot(&conn, &snapshot) {
                    error!(error = %e, "failed to persist snapshot");
                }
            }
            Err(_) => error!("connection lock poisoned, snapshot not persisted"),
        }
    }
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortQuery>,
) -> impl IntoResponse {
    let engine = match state.lock_engine() {
        Ok(engine) => engine,
        Err(e) => return ErrorResponse::internal(e),
    };

    let tasks = match query.sort.as_deref() {
        Some(raw) => match SortKey::from_str(raw) {
            Ok(key) => engine.store().sorted(key),
            Err(e) => return ErrorResponse::bad_request(e),
        },
        None => engine.display(),
    };

    let response = TaskListResponse {
        tasks: tasks.iter().map(TaskResponse::from).collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> impl IntoResponse {
    let mut engine = match state.lock_engine() {
        Ok(engine) => engine,
        Err(e) => return ErrorResponse::internal(e),
    };

    let actions = actions_from_value(&req.actions);
    let transcript = req.transcript.unwrap_or_default();
    let outcome = engine.submit(actions, &transcript);
    state.persist(&engine);

    (StatusCode::OK, Json(OutcomeResponse::from(outcome))).into_response()
}

pub async fn confirm_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> impl IntoResponse {
    let mut engine = match state.lock_engine() {
        Ok(engine) => engine,
        Err(e) => return ErrorResponse::internal(e),
    };

    let outcome = engine.confirm(req.accept);
    state.persist(&engine);
    (StatusCode::OK, Json(OutcomeResponse::from(outcome))).into_response()
}

pub async fn select_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectRequest>,
) -> impl IntoResponse {
    let mut engine = match state.lock_engine() {
        Ok(engine) => engine,
        Err(e) => return ErrorResponse::internal(e),
    };

    let outcome = engine.select(&req.ids);
    state.persist(&engine);
    (StatusCode::OK, Json(OutcomeResponse::from(outcome))).into_response()
}

pub async fn undo(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut engine = match state.lock_engine() {
        Ok(engine) => engine,
        Err(e) => return ErrorResponse::internal(e),
    };

    let reverted = engine.undo();
    state.persist(&engine);
    (StatusCode::OK, Json(UndoResponse { reverted })).into_response()
}
