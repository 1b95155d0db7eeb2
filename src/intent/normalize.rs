//! Boundary normalization for upstream action lists.
//!
//! The intent-extraction service is a language model: shapes drift, fields
//! get renamed, and a single action sometimes arrives as a bare object
//! instead of a list. Everything here is lenient. Unknown intents and
//! malformed elements degrade to [`Action::Unknown`] so one bad element
//! never fails the whole command.

use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::trace;

use crate::task::{Priority, SortKey};

use super::action::{Action, DueShift, NewTask, QueryKind, TaskUpdates};
use super::filter::{Filter, PositionRef, StatusFilter};

/// Normalize an upstream payload into an ordered action list.
pub fn actions_from_value(value: &Value) -> Vec<Action> {
    match value {
        Value::Array(items) => items.iter().map(action_from_value).collect(),
        Value::Object(obj) => {
            // Some payloads wrap the list in an envelope.
            if let Some(actions) = obj.get("actions").and_then(Value::as_array) {
                return actions.iter().map(action_from_value).collect();
            }
            vec![action_from_value(value)]
        }
        _ => vec![Action::Unknown],
    }
}

fn action_from_value(value: &Value) -> Action {
    let Some(obj) = value.as_object() else {
        return Action::Unknown;
    };

    let Some(kind) = str_field(obj, &["type", "intent", "action"]) else {
        return Action::Unknown;
    };
    let kind = kind.trim().to_uppercase().replace([' ', '-'], "_");

    match kind.as_str() {
        "ADD_TASK" | "ADD" | "CREATE_TASK" => {
            let tasks = new_tasks(obj);
            if tasks.is_empty() {
                Action::Unknown
            } else {
                Action::AddTask { tasks }
            }
        }
        "DELETE_TASK" | "DELETE" | "REMOVE_TASK" => Action::DeleteTask {
            filter: filter_from(obj),
        },
        "UPDATE_TASK" | "UPDATE" | "EDIT_TASK" => Action::UpdateTask {
            filter: filter_from(obj),
            updates: updates_from(obj),
        },
        "MARK_COMPLETED" | "COMPLETE_TASK" | "COMPLETE" => Action::MarkCompleted {
            filter: filter_from(obj),
        },
        "MARK_INCOMPLETE" | "UNCOMPLETE_TASK" | "REOPEN_TASK" => Action::MarkIncomplete {
            filter: filter_from(obj),
        },
        "DELETE_ALL" | "CLEAR_ALL" => Action::DeleteAll,
        "DELETE_OVERDUE" => Action::DeleteOverdue,
        "SORT_BY" | "SORT" => match str_field(obj, &["sortBy", "sort_by", "sort", "criterion"])
            .and_then(|s| SortKey::from_str(s).ok())
        {
            Some(key) => Action::SortBy { key },
            None => Action::Unknown,
        },
        "SHOW_TASKS" | "SHOW" | "LIST_TASKS" | "FILTER_TASKS" => Action::ShowTasks {
            filter: filter_from(obj),
        },
        "QUERY_TASK_INFO" | "QUERY" => Action::QueryTaskInfo {
            filter: filter_from(obj),
            query: query_kind(str_field(obj, &["queryType", "query_type", "query"])),
        },
        other => {
            trace!(intent = other, "unrecognized intent, degrading to UNKNOWN");
            Action::Unknown
        }
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn new_tasks(obj: &Map<String, Value>) -> Vec<NewTask> {
    let raw = match field(obj, &["tasks", "newTasks", "new_tasks", "task"]) {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
        None => Vec::new(),
    };

    let mut tasks: Vec<NewTask> = raw.into_iter().filter_map(new_task_from_value).collect();

    // Legacy shape: the text sits directly on the action object.
    if tasks.is_empty()
        && let Some(text) = str_field(obj, &["text", "content", "title"])
        && !text.trim().is_empty()
    {
        tasks.push(NewTask::new(text.trim()));
    }
    tasks
}

fn new_task_from_value(value: &Value) -> Option<NewTask> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(NewTask::new(text.trim())),
        Value::Object(obj) => {
            let text = str_field(obj, &["text", "task", "title", "content", "description"])?
                .trim()
                .to_string();
            if text.is_empty() {
                return None;
            }
            Some(NewTask {
                text,
                due_text: str_field(obj, &["dueDate", "due_date", "due", "when"])
                    .map(|s| s.to_string()),
                priority: str_field(obj, &["priority"]).and_then(|s| Priority::from_str(s).ok()),
                location: str_field(obj, &["location", "place"]).map(|s| s.to_string()),
            })
        }
        _ => None,
    }
}

fn filter_from(obj: &Map<String, Value>) -> Filter {
    let Some(filter_value) = field(obj, &["filter", "target"]) else {
        return Filter::default();
    };
    let Some(fobj) = filter_value.as_object() else {
        // A bare string filter is a topic.
        if let Some(topic) = filter_value.as_str()
            && !topic.trim().is_empty()
        {
            return Filter::by_topic(topic.trim());
        }
        return Filter::default();
    };

    Filter {
        topic: str_field(fobj, &["topic", "text", "task", "query", "description"])
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        due: str_field(fobj, &["dueDate", "due_date", "due", "date", "when"])
            .map(|s| s.to_string()),
        status: str_field(fobj, &["status"]).and_then(|s| StatusFilter::from_str(s).ok()),
        priorities: priorities_from(fobj),
        location: str_field(fobj, &["location", "place"]).map(|s| s.to_string()),
        positions: positions_from(fobj),
    }
}

fn priorities_from(obj: &Map<String, Value>) -> Vec<Priority> {
    match field(obj, &["priority", "priorities"]) {
        Some(Value::String(s)) => Priority::from_str(s).ok().into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| Priority::from_str(s).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn positions_from(obj: &Map<String, Value>) -> Vec<PositionRef> {
    let raw = match field(obj, &["positions", "position"]) {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
        None => Vec::new(),
    };
    raw.into_iter().filter_map(position_from_value).collect()
}

fn ordinal_word(word: &str) -> Option<usize> {
    match word {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        "sixth" => Some(6),
        "seventh" => Some(7),
        "eighth" => Some(8),
        "ninth" => Some(9),
        "tenth" => Some(10),
        _ => None,
    }
}

fn position_from_value(value: &Value) -> Option<PositionRef> {
    match value {
        Value::Number(n) => {
            let n = n.as_i64()?;
            if n >= 1 {
                Some(PositionRef::Index(n as usize))
            } else {
                None
            }
        }
        Value::String(s) => {
            let s = s.trim().to_lowercase().replace(['-', '_'], " ");
            match s.as_str() {
                "last" => Some(PositionRef::Last),
                "second last" | "second to last" | "penultimate" => Some(PositionRef::SecondLast),
                "odd" => Some(PositionRef::Odd),
                "even" => Some(PositionRef::Even),
                "all" | "every" => Some(PositionRef::All),
                other => {
                    if let Some(n) = ordinal_word(other) {
                        return Some(PositionRef::Index(n));
                    }
                    let n: usize = other.parse().ok()?;
                    if n >= 1 { Some(PositionRef::Index(n)) } else { None }
                }
            }
        }
        Value::Object(obj) => {
            let start = field(obj, &["start", "from"])?.as_i64()?;
            let end = field(obj, &["end", "to"])?.as_i64()?;
            Some(PositionRef::Range { start, end })
        }
        _ => None,
    }
}

fn updates_from(obj: &Map<String, Value>) -> TaskUpdates {
    let Some(updates_value) = field(obj, &["updates", "changes"]) else {
        return TaskUpdates::default();
    };
    let Some(uobj) = updates_value.as_object() else {
        return TaskUpdates::default();
    };

    // An explicit JSON null for the due date means "clear it".
    let due_value = field(uobj, &["dueDate", "due_date", "due"]);
    let clear_due = matches!(due_value, Some(Value::Null))
        || field(uobj, &["clearDueDate", "clear_due_date", "clear_due"])
            .and_then(Value::as_bool)
            .unwrap_or(false);

    TaskUpdates {
        text: str_field(uobj, &["text", "newText", "new_text", "title"]).map(|s| s.to_string()),
        priority: str_field(uobj, &["priority"]).and_then(|s| Priority::from_str(s).ok()),
        due_text: due_value.and_then(Value::as_str).map(|s| s.to_string()),
        clear_due,
        location: str_field(uobj, &["location", "place"]).map(|s| s.to_string()),
        due_shift: due_shift_from(uobj),
    }
}

fn due_shift_from(obj: &Map<String, Value>) -> Option<DueShift> {
    let shift = field(obj, &["dueDateShift", "due_date_shift", "shift"])?.as_object()?;
    let days = field(shift, &["days", "day"]).and_then(Value::as_i64).unwrap_or(0);
    let weeks = field(shift, &["weeks", "week"]).and_then(Value::as_i64).unwrap_or(0);
    let months = field(shift, &["months", "month"]).and_then(Value::as_i64).unwrap_or(0) as i32;
    let shift = DueShift { days, weeks, months };
    if shift.is_zero() { None } else { Some(shift) }
}

fn query_kind(raw: Option<&str>) -> QueryKind {
    match raw.map(|s| s.trim().to_lowercase().replace([' ', '-'], "_")).as_deref() {
        Some("count") | Some("how_many") => QueryKind::Count,
        Some("due_date") | Some("duedate") | Some("due") | Some("when") => QueryKind::DueDate,
        Some("priority") => QueryKind::Priority,
        Some("location") | Some("where") => QueryKind::Location,
        _ => QueryKind::Details,
    }
}
