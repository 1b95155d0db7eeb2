//! Natural-language date handling at the boundary of the command engine.
//!
//! The engine treats date parsing as an injected capability: anything that
//! needs to turn "friday" or "in two weeks" into an instant goes through the
//! [`DateParser`] trait. The built-in [`NaturalDateParser`] covers the
//! common relative expressions with a forward-looking bias ("friday" is the
//! next friday, never the last one). It is not a general NL date library.

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveTime, TimeZone,
    Weekday,
};
use regex_lite::Regex;

/// An inclusive instant range resolved from a date expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

pub trait DateParser: Send + Sync {
    /// Resolve a date/time expression to an instant, relative to `reference`.
    /// Forward-looking: weekday names mean the next occurrence.
    fn parse_date(&self, text: &str, reference: DateTime<Local>) -> Option<DateTime<Local>>;

    /// Resolve an expression naming a span ("this week", "between monday and
    /// friday") to a range. Single-day expressions yield a one-day range.
    fn parse_date_range(&self, text: &str, reference: DateTime<Local>) -> Option<DateRange>;
}

fn time_or_midnight(h: u32, m: u32, s: u32, ms: u32) -> NaiveTime {
    NaiveTime::from_hms_milli_opt(h, m, s, ms).unwrap_or_default()
}

/// Attach a wall-clock time to a calendar date in the local zone.
/// DST gaps fall back to interpreting the naive time as UTC.
fn at_local(date: NaiveDate, time: NaiveTime) -> DateTime<Local> {
    match date.and_time(time).and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => Local.from_utc_datetime(&date.and_time(time)),
    }
}

pub fn day_start(date: NaiveDate) -> DateTime<Local> {
    at_local(date, time_or_midnight(0, 0, 0, 0))
}

pub fn day_end(date: NaiveDate) -> DateTime<Local> {
    at_local(date, time_or_midnight(23, 59, 59, 999))
}

/// Midday anchor for due-date comparisons. Comparing calendar dates at noon
/// keeps a timezone shift of a few hours from moving a task across a day
/// boundary.
pub fn midday(date: NaiveDate) -> DateTime<Local> {
    at_local(date, time_or_midnight(12, 0, 0, 0))
}

/// Built-in forward-looking parser for relative date expressions.
#[derive(Debug, Default, Clone)]
pub struct NaturalDateParser;

impl NaturalDateParser {
    pub fn new() -> Self {
        Self
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next occurrence of `target` strictly after `from` (same weekday -> +7).
fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_days = from.weekday().num_days_from_monday() as i64;
    let target_days = target.num_days_from_monday() as i64;
    let mut ahead = (target_days - from_days).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    from + Duration::days(ahead)
}

fn parse_unit_count(word: &str) -> Option<i64> {
    match word {
        "a" | "an" | "one" => Some(1),
        "two" | "couple" => Some(2),
        "three" | "few" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        _ => word.parse::<i64>().ok(),
    }
}

/// The day a bare expression points at, ignoring any time-of-day words.
fn resolve_day(text: &str, reference: DateTime<Local>) -> Option<NaiveDate> {
    let today = reference.date_naive();

    if let Some(caps) = Regex::new(r"(\d{4})-(\d{2})-(\d{2})")
        .ok()
        .and_then(|re| re.captures(text))
    {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if text.contains("day after tomorrow") {
        return Some(today + Duration::days(2));
    }
    if text.contains("tomorrow") {
        return Some(today + Duration::days(1));
    }
    if text.contains("today") || text.contains("tonight") || text.contains("this evening") {
        return Some(today);
    }

    if let Some(caps) = Regex::new(r"in (\w+) (day|week|month)s?\b")
        .ok()
        .and_then(|re| re.captures(text))
    {
        let count = parse_unit_count(caps.get(1)?.as_str())?;
        return match caps.get(2)?.as_str() {
            "day" => today.checked_add_signed(Duration::days(count)),
            "week" => today.checked_add_signed(Duration::days(count * 7)),
            "month" => today.checked_add_months(Months::new(count.max(0) as u32)),
            _ => None,
        };
    }

    if text.contains("next week") {
        return Some(today + Duration::days(7));
    }
    if text.contains("next month") {
        return today.checked_add_months(Months::new(1));
    }

    if let Some(caps) = Regex::new(
        r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .ok()
    .and_then(|re| re.captures(text))
    {
        let target = weekday_from_name(caps.get(1)?.as_str())?;
        return Some(next_weekday(today, target));
    }

    None
}

/// A clock time mentioned in the expression, if any.
fn resolve_time(text: &str) -> Option<NaiveTime> {
    if text.contains("noon") {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if text.contains("midnight") {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    if text.contains("tonight") || text.contains("this evening") {
        return NaiveTime::from_hms_opt(20, 0, 0);
    }

    let caps = Regex::new(r"\b(?:at )?(\d{1,2})(?::(\d{2}))? ?(am|pm)\b")
        .ok()
        .and_then(|re| re.captures(text))?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .map(|m| m.as_str().parse().unwrap_or(0))
        .unwrap_or(0);
    let meridiem = caps.get(3)?.as_str();
    if hour > 12 {
        return None;
    }
    if meridiem == "pm" && hour != 12 {
        hour += 12;
    }
    if meridiem == "am" && hour == 12 {
        hour = 0;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

impl DateParser for NaturalDateParser {
    fn parse_date(&self, text: &str, reference: DateTime<Local>) -> Option<DateTime<Local>> {
        let text = text.to_lowercase();
        let day = resolve_day(&text, reference);
        let time = resolve_time(&text);

        match (day, time) {
            (Some(day), Some(time)) => Some(at_local(day, time)),
            (Some(day), None) => {
                if text.contains("in ")
                    && let Some(caps) = Regex::new(r"in (\w+) (minute|min|hour)s?\b")
                        .ok()
                        .and_then(|re| re.captures(&text))
                {
                    let count = parse_unit_count(caps.get(1)?.as_str())?;
                    return match caps.get(2)?.as_str() {
                        "hour" => Some(reference + Duration::hours(count)),
                        _ => Some(reference + Duration::minutes(count)),
                    };
                }
                Some(midday(day))
            }
            (None, Some(time)) => {
                // Bare clock time: today if still ahead, otherwise tomorrow.
                let today = reference.date_naive();
                let candidate = at_local(today, time);
                if candidate > reference {
                    Some(candidate)
                } else {
                    Some(at_local(today + Duration::days(1), time))
                }
            }
            (None, None) => {
                let caps = Regex::new(r"in (\w+) (minute|min|hour)s?\b")
                    .ok()
                    .and_then(|re| re.captures(&text))?;
                let count = parse_unit_count(caps.get(1)?.as_str())?;
                match caps.get(2)?.as_str() {
                    "hour" => Some(reference + Duration::hours(count)),
                    _ => Some(reference + Duration::minutes(count)),
                }
            }
        }
    }

    fn parse_date_range(&self, text: &str, reference: DateTime<Local>) -> Option<DateRange> {
        let text = text.to_lowercase();
        let today = reference.date_naive();

        if let Some(caps) = Regex::new(r"(?:between|from) (.+?) (?:and|to|until) (.+)")
            .ok()
            .and_then(|re| re.captures(&text))
        {
            let start = self.parse_date(caps.get(1)?.as_str(), reference)?;
            let end = self.parse_date(caps.get(2)?.as_str(), reference)?;
            return Some(DateRange { start, end });
        }

        // "weekend" first: "this weekend" also contains "this week".
        if text.contains("weekend") {
            let wd = today.weekday().num_days_from_monday() as i64;
            let saturday = if wd == 6 {
                today - Duration::days(1)
            } else {
                today + Duration::days(5 - wd)
            };
            return Some(DateRange {
                start: day_start(saturday),
                end: day_end(saturday + Duration::days(1)),
            });
        }
        if text.contains("this week") {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            return Some(DateRange {
                start: day_start(monday),
                end: day_end(monday + Duration::days(6)),
            });
        }
        if text.contains("next week") {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64)
                + Duration::days(7);
            return Some(DateRange {
                start: day_start(monday),
                end: day_end(monday + Duration::days(6)),
            });
        }
        if text.contains("this month") {
            let first = today.with_day(1)?;
            let last = first.checked_add_months(Months::new(1))? - Duration::days(1);
            return Some(DateRange {
                start: day_start(first),
                end: day_end(last),
            });
        }
        if text.contains("next month") {
            let first = today.with_day(1)?.checked_add_months(Months::new(1))?;
            let last = first.checked_add_months(Months::new(1))? - Duration::days(1);
            return Some(DateRange {
                start: day_start(first),
                end: day_end(last),
            });
        }

        let day = resolve_day(&text, reference)?;
        Some(DateRange {
            start: day_start(day),
            end: day_end(day),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<Local> {
        // Monday 2024-01-15, 10:00 local
        at_local(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_tomorrow() {
        let parser = NaturalDateParser::new();
        let dt = parser.parse_date("remind me tomorrow", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn test_weekday_is_forward_looking() {
        let parser = NaturalDateParser::new();
        // Reference is a Monday; "monday" must be the NEXT monday.
        let dt = parser.parse_date("monday", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 22).unwrap());

        let dt = parser.parse_date("friday", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());
    }

    #[test]
    fn test_iso_date() {
        let parser = NaturalDateParser::new();
        let dt = parser.parse_date("on 2024-03-01", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_in_n_days_and_weeks() {
        let parser = NaturalDateParser::new();
        let dt = parser.parse_date("in 3 days", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 18).unwrap());

        let dt = parser.parse_date("in two weeks", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 29).unwrap());
    }

    #[test]
    fn test_in_hours_is_clock_relative() {
        let parser = NaturalDateParser::new();
        let dt = parser.parse_date("in 2 hours", reference()).unwrap();
        assert_eq!(dt, reference() + Duration::hours(2));
    }

    #[test]
    fn test_tomorrow_with_time() {
        let parser = NaturalDateParser::new();
        let dt = parser.parse_date("tomorrow at 5pm", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
    }

    #[test]
    fn test_bare_time_rolls_forward() {
        let parser = NaturalDateParser::new();
        // 9am is already past the 10:00 reference, so it means tomorrow 9am.
        let dt = parser.parse_date("at 9am", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());

        let dt = parser.parse_date("at 11am", reference()).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_this_week_range() {
        let parser = NaturalDateParser::new();
        let range = parser.parse_date_range("this week", reference()).unwrap();
        assert_eq!(range.start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(range.end.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 21).unwrap());
    }

    #[test]
    fn test_single_day_range_covers_whole_day() {
        let parser = NaturalDateParser::new();
        let range = parser.parse_date_range("tomorrow", reference()).unwrap();
        assert_eq!(range.start, day_start(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));
        assert_eq!(range.end, day_end(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));
    }

    #[test]
    fn test_weekend_range_wins_over_week() {
        let parser = NaturalDateParser::new();
        let range = parser.parse_date_range("this weekend", reference()).unwrap();
        assert_eq!(range.start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(range.end.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 21).unwrap());
    }

    #[test]
    fn test_between_range() {
        let parser = NaturalDateParser::new();
        let range = parser
            .parse_date_range("between tuesday and friday", reference())
            .unwrap();
        assert_eq!(range.start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(range.end.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());
    }

    #[test]
    fn test_unparseable_returns_none() {
        let parser = NaturalDateParser::new();
        assert!(parser.parse_date("buy milk", reference()).is_none());
        assert!(parser.parse_date_range("buy milk", reference()).is_none());
    }

    #[test]
    fn test_midday_anchor() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(midday(date).time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert!(day_start(date) < midday(date));
        assert!(midday(date) < day_end(date));
    }
}
