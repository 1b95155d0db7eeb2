//! Positional references against the display order.
//!
//! Positions are "what the user currently sees": 1-based, evaluated
//! against the sorted display list rather than creation order. Out of
//! bounds indices are dropped, duplicates are collapsed, and the matched
//! indices come back in display order.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::intent::PositionRef;
use crate::task::Task;

fn range_index(value: i64, len: usize) -> i64 {
    // Negative values count from the end: -1 is the last task.
    if value < 0 { len as i64 + value } else { value - 1 }
}

pub fn resolve_positions(positions: &[PositionRef], display: &[Task]) -> Vec<Uuid> {
    let len = display.len();
    if len == 0 {
        return Vec::new();
    }

    let mut indices: BTreeSet<usize> = BTreeSet::new();

    for position in positions {
        match position {
            PositionRef::Index(n) => {
                if *n >= 1 && *n <= len {
                    indices.insert(n - 1);
                }
            }
            PositionRef::Last => {
                indices.insert(len - 1);
            }
            PositionRef::SecondLast => {
                if len >= 2 {
                    indices.insert(len - 2);
                }
            }
            PositionRef::Odd => {
                indices.extend((0..len).step_by(2));
            }
            PositionRef::Even => {
                indices.extend((1..len).step_by(2));
            }
            PositionRef::All => {
                indices.extend(0..len);
            }
            PositionRef::Range { start, end } => {
                let a = range_index(*start, len);
                let b = range_index(*end, len);
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let lo = lo.clamp(0, len as i64 - 1) as usize;
                let hi = hi.clamp(0, len as i64 - 1) as usize;
                indices.extend(lo..=hi);
            }
        }
    }

    indices.into_iter().map(|i| display[i].id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn display(n: usize) -> Vec<Task> {
        (0..n).map(|i| Task::new(format!("task {}", i + 1), Utc::now())).collect()
    }

    fn ids(tasks: &[Task], indices: &[usize]) -> Vec<Uuid> {
        indices.iter().map(|i| tasks[*i].id).collect()
    }

    #[test]
    fn test_numeric_positions() {
        let list = display(4);
        assert_eq!(
            resolve_positions(&[PositionRef::Index(1), PositionRef::Index(3)], &list),
            ids(&list, &[0, 2])
        );
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let list = display(2);
        assert_eq!(
            resolve_positions(&[PositionRef::Index(5)], &list),
            Vec::<Uuid>::new()
        );
    }

    #[test]
    fn test_last_equals_numeric_n() {
        let list = display(5);
        let by_last = resolve_positions(&[PositionRef::Last], &list);
        let by_index = resolve_positions(&[PositionRef::Index(5)], &list);
        assert_eq!(by_last, by_index);
    }

    #[test]
    fn test_second_last_needs_two() {
        let list = display(1);
        assert!(resolve_positions(&[PositionRef::SecondLast], &list).is_empty());

        let list = display(3);
        assert_eq!(
            resolve_positions(&[PositionRef::SecondLast], &list),
            ids(&list, &[1])
        );
    }

    #[test]
    fn test_odd_and_even_are_displayed_positions() {
        let list = display(5);
        // Displayed positions 1, 3, 5.
        assert_eq!(
            resolve_positions(&[PositionRef::Odd], &list),
            ids(&list, &[0, 2, 4])
        );
        // Displayed positions 2, 4.
        assert_eq!(
            resolve_positions(&[PositionRef::Even], &list),
            ids(&list, &[1, 3])
        );
    }

    #[test]
    fn test_all() {
        let list = display(3);
        assert_eq!(
            resolve_positions(&[PositionRef::All], &list),
            ids(&list, &[0, 1, 2])
        );
    }

    #[test]
    fn test_negative_range_counts_from_end() {
        let list = display(5);
        assert_eq!(
            resolve_positions(&[PositionRef::Range { start: -2, end: -1 }], &list),
            ids(&list, &[3, 4])
        );
    }

    #[test]
    fn test_range_clamps() {
        let list = display(3);
        assert_eq!(
            resolve_positions(&[PositionRef::Range { start: 2, end: 99 }], &list),
            ids(&list, &[1, 2])
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let list = display(3);
        assert_eq!(
            resolve_positions(
                &[PositionRef::Last, PositionRef::Index(3), PositionRef::All],
                &list
            ),
            ids(&list, &[0, 1, 2])
        );
    }

    #[test]
    fn test_empty_display() {
        assert!(resolve_positions(&[PositionRef::All], &[]).is_empty());
    }
}
