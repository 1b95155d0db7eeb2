//! Reference resolution: mapping a declarative [`Filter`] to concrete
//! task ids against the current store state.

pub mod position;
pub mod topic;

use chrono::{DateTime, Duration, Local};
use uuid::Uuid;

use crate::config::SynonymGroups;
use crate::dates::{day_end, day_start, midday, DateParser, DateRange};
use crate::intent::{Filter, StatusFilter};
use crate::task::Task;

pub use position::resolve_positions;
pub use topic::match_topic;

/// Everything a resolution pass needs besides the tasks themselves. `now`
/// is captured once per command batch so that all passes in one resolution
/// agree on "today".
pub struct ResolveContext<'a> {
    pub synonyms: &'a SynonymGroups,
    pub parser: &'a dyn DateParser,
    pub now: DateTime<Local>,
}

impl<'a> ResolveContext<'a> {
    /// Resolve `filter` to an ordered id list.
    ///
    /// Attribute passes narrow `all` (creation order) successively. When
    /// any position token is present, positional resolution against
    /// `display` fully replaces the attribute passes: positions are what
    /// the user sees, and they win outright when both are given.
    pub fn resolve(&self, all: &[Task], display: &[Task], filter: &Filter) -> Vec<Uuid> {
        if !filter.positions.is_empty() {
            return resolve_positions(&filter.positions, display);
        }

        let mut working: Vec<&Task> = all.iter().collect();

        if let Some(topic) = &filter.topic {
            let ids = match_topic(all, topic, self.synonyms);
            working.retain(|t| ids.contains(&t.id));
        }

        if let Some(expr) = &filter.due {
            match self.due_range(expr) {
                Some(range) => {
                    working.retain(|t| {
                        t.due_date
                            .map(|d| {
                                let anchor = midday(d);
                                anchor >= range.start && anchor <= range.end
                            })
                            .unwrap_or(false)
                    });
                }
                // An expression that resolves to nothing matches nothing;
                // being over-permissive here would let a vague phrase
                // select tasks for deletion.
                None => return Vec::new(),
            }
        }

        if let Some(status) = filter.status {
            let today = self.now.date_naive();
            working.retain(|t| match status {
                StatusFilter::Completed => t.completed,
                StatusFilter::Incomplete => !t.completed,
                StatusFilter::Overdue => t.is_overdue(today),
            });
        }

        if !filter.priorities.is_empty() {
            working.retain(|t| t.priority.is_some_and(|p| filter.priorities.contains(&p)));
        }

        if let Some(location) = &filter.location {
            let needle = location.to_lowercase();
            working.retain(|t| {
                t.location
                    .as_ref()
                    .is_some_and(|l| l.to_lowercase().contains(&needle))
            });
        }

        working.into_iter().map(|t| t.id).collect()
    }

    /// Resolve a due expression to a full-day-covering range. A parser hit
    /// without an explicit end defaults to one day of coverage.
    fn due_range(&self, expr: &str) -> Option<DateRange> {
        let range = self.parser.parse_date_range(expr, self.now).or_else(|| {
            self.parser.parse_date(expr, self.now).map(|start| DateRange {
                start,
                end: start + Duration::days(1) - Duration::milliseconds(1),
            })
        })?;
        Some(DateRange {
            start: day_start(range.start.date_naive()),
            end: day_end(range.end.date_naive()),
        })
    }
}
