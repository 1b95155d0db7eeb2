//! Local priority inference.
//!
//! A cheap, explainable, zero-latency backstop for tasks that arrive
//! without an explicit priority from the upstream intent service. Purely
//! keyword and date-proximity driven; deterministic for a fixed reference
//! instant.

use chrono::{DateTime, Local};

use crate::config::KeywordsConfig;
use crate::dates::DateParser;

use super::priority::Priority;

const URGENT_SCORE: u32 = 90;
const IMPACT_BONUS: u32 = 15;
const ERRAND_BONUS: u32 = 10;
const RECURRENCE_PENALTY: u32 = 10;

const HIGH_THRESHOLD: u32 = 70;
const MEDIUM_THRESHOLD: u32 = 30;
const LOW_THRESHOLD: u32 = 5;

/// Outcome of scoring a piece of command text.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityHint {
    pub priority: Option<Priority>,
    pub score: u32,
    pub reason: String,
}

impl PriorityHint {
    fn none() -> Self {
        Self {
            priority: None,
            score: 0,
            reason: "no signal".to_string(),
        }
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str()))
}

fn date_proximity_score(hours_until: f64) -> u32 {
    if hours_until <= 4.0 {
        40
    } else if hours_until <= 24.0 {
        30
    } else if hours_until <= 72.0 {
        15
    } else {
        5
    }
}

fn bucket(score: u32) -> Option<Priority> {
    if score >= HIGH_THRESHOLD {
        Some(Priority::High)
    } else if score >= MEDIUM_THRESHOLD {
        Some(Priority::Medium)
    } else if score >= LOW_THRESHOLD {
        Some(Priority::Low)
    } else {
        None
    }
}

/// Score raw command text into a priority bucket.
///
/// Urgent keywords short-circuit to high at score 90 without any further
/// scoring. Otherwise the score is the date-proximity contribution plus
/// impact/errand bonuses, minus a recurrence penalty, floored at zero.
pub fn detect_priority(
    text: &str,
    keywords: &KeywordsConfig,
    parser: &dyn DateParser,
    now: DateTime<Local>,
) -> PriorityHint {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return PriorityHint::none();
    }

    if contains_any(&text, &keywords.urgent) {
        return PriorityHint {
            priority: Some(Priority::High),
            score: URGENT_SCORE,
            reason: "urgent keyword".to_string(),
        };
    }

    let mut score: u32 = 0;
    let mut reasons: Vec<&str> = Vec::new();

    if let Some(when) = parser.parse_date(&text, now) {
        let hours_until = (when - now).num_minutes() as f64 / 60.0;
        score += date_proximity_score(hours_until);
        reasons.push("due date proximity");
    }

    if contains_any(&text, &keywords.impact) {
        score += IMPACT_BONUS;
        reasons.push("impact keyword");
    }
    if contains_any(&text, &keywords.errand) {
        score += ERRAND_BONUS;
        reasons.push("errand keyword");
    }
    if contains_any(&text, &keywords.recurrence) {
        score = score.saturating_sub(RECURRENCE_PENALTY);
        reasons.push("recurring");
    }

    let reason = if reasons.is_empty() {
        "no signal".to_string()
    } else {
        reasons.join(", ")
    };

    PriorityHint {
        priority: bucket(score),
        score,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::NaturalDateParser;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn hint(text: &str) -> PriorityHint {
        detect_priority(text, &KeywordsConfig::default(), &NaturalDateParser::new(), now())
    }

    #[test]
    fn test_urgent_keyword_short_circuits() {
        // "rent" is also an impact keyword; the urgent path must win alone
        // at exactly 90, not 90 + 15.
        let h = hint("urgent: pay rent");
        assert_eq!(h.priority, Some(Priority::High));
        assert_eq!(h.score, 90);
        assert_eq!(h.reason, "urgent keyword");
    }

    #[test]
    fn test_due_soon_plus_impact_is_medium() {
        // "in 2 hours" -> 40, "bill" -> +15
        let h = hint("pay the electricity bill in 2 hours");
        assert_eq!(h.score, 55);
        assert_eq!(h.priority, Some(Priority::Medium));
    }

    #[test]
    fn test_impact_alone_is_low() {
        let h = hint("submit the form sometime");
        assert_eq!(h.score, 15);
        assert_eq!(h.priority, Some(Priority::Low));
    }

    #[test]
    fn test_far_date_alone_is_low() {
        let h = hint("trip on 2024-06-01");
        assert_eq!(h.score, 5);
        assert_eq!(h.priority, Some(Priority::Low));
    }

    #[test]
    fn test_recurrence_subtracts() {
        // "grocery" errand +10, "weekly" -10 -> 0, no signal bucket
        let h = hint("weekly grocery run");
        assert_eq!(h.score, 0);
        assert_eq!(h.priority, None);
    }

    #[test]
    fn test_recurrence_floors_at_zero() {
        let h = hint("water the plants daily");
        assert_eq!(h.score, 0);
        assert_eq!(h.priority, None);
    }

    #[test]
    fn test_no_signal() {
        let h = hint("buy milk");
        assert_eq!(h.score, 0);
        assert_eq!(h.priority, None);
        assert_eq!(h.reason, "no signal");
    }

    #[test]
    fn test_due_within_a_day_is_medium() {
        // Tomorrow 9am is 23 hours from the reference: 30 points.
        let h = hint("meeting tomorrow at 9am");
        assert_eq!(h.score, 30);
        assert_eq!(h.priority, Some(Priority::Medium));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hint("pay rent tomorrow"), hint("pay rent tomorrow"));
    }
}
