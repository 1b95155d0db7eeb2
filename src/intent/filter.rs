use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::task::Priority;

/// Completion/overdue constraint inside a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Completed,
    Incomplete,
    Overdue,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" | "finished" => Ok(StatusFilter::Completed),
            "incomplete" | "open" | "pending" | "active" | "unfinished" => {
                Ok(StatusFilter::Incomplete)
            }
            "overdue" | "late" | "past_due" | "past due" => Ok(StatusFilter::Overdue),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// A positional reference against the display order, as the user sees it.
/// Ordinals are 1-based; negative range bounds count from the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionRef {
    Index(usize),
    Last,
    SecondLast,
    Odd,
    Even,
    All,
    Range { start: i64, end: i64 },
}

/// Declarative selector describing which tasks an action targets.
///
/// When `positions` is non-empty it takes exclusive precedence: attribute
/// fields are ignored and resolution happens purely against the display
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub topic: Option<String>,
    /// Natural-language due-date expression, resolved at match time.
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub status: Option<StatusFilter>,
    #[serde(default)]
    pub priorities: Vec<Priority>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub positions: Vec<PositionRef>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.due.is_none()
            && self.status.is_none()
            && self.priorities.is_empty()
            && self.location.is_none()
            && self.positions.is_empty()
    }

    pub fn by_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    pub fn by_positions(positions: Vec<PositionRef>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn by_status(status: StatusFilter) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!("done".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert_eq!("open".parse::<StatusFilter>().unwrap(), StatusFilter::Incomplete);
        assert_eq!("overdue".parse::<StatusFilter>().unwrap(), StatusFilter::Overdue);
        assert!("???".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_filter_is_empty() {
        assert!(Filter::default().is_empty());
        assert!(!Filter::by_topic("milk").is_empty());
        assert!(!Filter::by_positions(vec![PositionRef::Last]).is_empty());
    }
}
