//! Natural-language date phrases.
//!
//! Resolves deadline phrases ("tomorrow at 5pm", "next Monday", "in 2
//! hours") to an instant, and retrieval phrases ("last week", "on Friday")
//! to a range. Both take `now` explicitly; phrases are interpreted in the
//! time zone of `now`.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use regex::Regex;

/// An inclusive time range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// =============================================================================
// Compiled patterns
// =============================================================================

struct RangePatterns {
    yesterday: Regex,
    today: Regex,
    this_morning: Regex,
    this_afternoon: Regex,
    last_week: Regex,
    this_week: Regex,
    last_month: Regex,
    on_weekday: Regex,
}

static RANGE_PATTERNS: LazyLock<RangePatterns> = LazyLock::new(|| RangePatterns {
    yesterday: compile(r"(?i)\byesterday\b"),
    today: compile(r"(?i)\btoday\b"),
    this_morning: compile(r"(?i)\bthis\s+morning\b"),
    this_afternoon: compile(r"(?i)\bthis\s+afternoon\b"),
    last_week: compile(r"(?i)\blast\s+week\b"),
    this_week: compile(r"(?i)\bthis\s+week\b"),
    last_month: compile(r"(?i)\blast\s+month\b"),
    on_weekday: compile(
        r"(?i)\bon\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    ),
});

struct DeadlinePatterns {
    relative: Regex,
    day_after_tomorrow: Regex,
    tomorrow: Regex,
    today: Regex,
    tonight: Regex,
    next_week: Regex,
    next_month: Regex,
    weekday: Regex,
    clock: Regex,
    part_of_day: Regex,
}

static DEADLINE_PATTERNS: LazyLock<DeadlinePatterns> = LazyLock::new(|| DeadlinePatterns {
    relative: compile(r"(?i)\bin\s+(\d+|an?|one)\s+(minute|min|hour|hr|day|week)s?\b"),
    day_after_tomorrow: compile(r"(?i)\bday\s+after\s+tomorrow\b"),
    tomorrow: compile(r"(?i)\btomorrow\b"),
    today: compile(r"(?i)\b(?:today|now)\b"),
    tonight: compile(r"(?i)\btonight\b"),
    next_week: compile(r"(?i)\bnext\s+week\b"),
    next_month: compile(r"(?i)\bnext\s+month\b"),
    weekday: compile(
        r"(?i)\b(next\s+|this\s+|on\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    ),
    clock: compile(r"(?i)\b(?:at\s+|by\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b|\b(\d{1,2}):(\d{2})\b"),
    part_of_day: compile(r"(?i)\b(noon|midnight|morning|afternoon|evening)\b"),
});

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time literals covered by the tests below.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid time pattern {pattern}: {e}"))
}

// =============================================================================
// Ranges
// =============================================================================

/// Resolve a retrieval phrase to a time range.
///
/// Supports today, yesterday, this morning, this afternoon, this week, last
/// week, last month and "on <weekday>" (most recent occurrence).
pub fn resolve_range<Tz: TimeZone>(phrase: &str, now: &DateTime<Tz>) -> Option<DateRange> {
    let tp = &*RANGE_PATTERNS;
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    if tp.this_morning.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, today, 0, 0)?,
            end: local_at(now, today, 12, 0)?,
        });
    }

    if tp.this_afternoon.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, today, 12, 0)?,
            end: local_at(now, today, 18, 0)?,
        });
    }

    if tp.yesterday.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, shift_days(today, -1)?, 0, 0)?,
            end: local_at(now, today, 0, 0)?,
        });
    }

    if tp.today.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, today, 0, 0)?,
            end: now_utc,
        });
    }

    if tp.this_week.is_match(phrase) {
        let monday = shift_days(today, -(now.weekday().num_days_from_monday() as i64))?;
        return Some(DateRange {
            start: local_at(now, monday, 0, 0)?,
            end: now_utc,
        });
    }

    if tp.last_week.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, shift_days(today, -7)?, 0, 0)?,
            end: now_utc,
        });
    }

    if tp.last_month.is_match(phrase) {
        return Some(DateRange {
            start: local_at(now, shift_days(today, -30)?, 0, 0)?,
            end: now_utc,
        });
    }

    if let Some(caps) = tp.on_weekday.captures(phrase) {
        let target = parse_weekday(caps.get(1)?.as_str())?;
        let days_back = (now.weekday().num_days_from_monday() as i64
            - target.num_days_from_monday() as i64
            + 7)
            % 7;
        let day = shift_days(today, -days_back)?;
        return Some(DateRange {
            start: local_at(now, day, 0, 0)?,
            end: local_at_hms(now, day, 23, 59, 59)?,
        });
    }

    None
}

// =============================================================================
// Deadlines
// =============================================================================

/// Resolve a deadline phrase to an instant.
///
/// Accepts ISO dates and date-times, relative offsets ("in 3 days"), day
/// words (today, tonight, tomorrow, next week, weekdays) optionally combined
/// with a clock time ("at 5pm", "14:30", "noon"). A day without a clock time
/// keeps the current time of day; a bare ISO date means end of that day.
pub fn resolve_deadline<Tz: TimeZone>(phrase: &str, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return None;
    }

    if let Some(absolute) = parse_absolute(phrase, now) {
        return Some(absolute);
    }

    let dp = &*DEADLINE_PATTERNS;

    if let Some(caps) = dp.relative.captures(phrase) {
        let amount: i64 = match caps.get(1)?.as_str().to_lowercase().as_str() {
            "a" | "an" | "one" => 1,
            digits => digits.parse().ok()?,
        };
        let unit = caps.get(2)?.as_str().to_lowercase();
        let offset = match unit.as_str() {
            "minute" | "min" => Duration::try_minutes(amount),
            "hour" | "hr" => Duration::try_hours(amount),
            "day" => Duration::try_days(amount),
            _ => Duration::try_weeks(amount),
        }?;
        return now.with_timezone(&Utc).checked_add_signed(offset);
    }

    let today = now.date_naive();
    let day = if dp.day_after_tomorrow.is_match(phrase) {
        Some(shift_days(today, 2)?)
    } else if dp.tomorrow.is_match(phrase) {
        Some(shift_days(today, 1)?)
    } else if dp.next_week.is_match(phrase) {
        Some(shift_days(today, 7)?)
    } else if dp.next_month.is_match(phrase) {
        Some(shift_days(today, 30)?)
    } else if let Some(caps) = dp.weekday.captures(phrase) {
        let target = parse_weekday(caps.get(2)?.as_str())?;
        let forced_next = caps
            .get(1)
            .is_some_and(|m| m.as_str().trim().eq_ignore_ascii_case("next"));
        let mut ahead = (target.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64
            + 7)
            % 7;
        if ahead == 0 && forced_next {
            ahead = 7;
        }
        Some(shift_days(today, ahead)?)
    } else if dp.today.is_match(phrase) || dp.tonight.is_match(phrase) {
        Some(today)
    } else {
        None
    };

    let clock = parse_clock(phrase).or_else(|| {
        dp.tonight
            .is_match(phrase)
            .then(|| NaiveTime::from_hms_opt(20, 0, 0))
            .flatten()
    });

    match (day, clock) {
        (Some(day), Some(time)) => local_naive(now, day.and_time(time)),
        (Some(day), None) => local_naive(now, day.and_time(now.time())),
        (None, Some(time)) => local_naive(now, today.and_time(time)),
        (None, None) => None,
    }
}

fn parse_absolute<Tz: TimeZone>(phrase: &str, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(phrase) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(phrase, fmt) {
            return local_naive(now, naive);
        }
    }
    let date = NaiveDate::parse_from_str(phrase, "%Y-%m-%d").ok()?;
    local_at_hms(now, date, 23, 59, 59)
}

fn parse_clock(phrase: &str) -> Option<NaiveTime> {
    let dp = &*DEADLINE_PATTERNS;

    if let Some(caps) = dp.clock.captures(phrase) {
        if let Some(hour) = caps.get(1) {
            let mut hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            let meridiem = caps.get(3)?.as_str().to_lowercase();
            if hour == 0 || hour > 12 {
                return None;
            }
            if meridiem == "pm" && hour != 12 {
                hour += 12;
            } else if meridiem == "am" && hour == 12 {
                hour = 0;
            }
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
        let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(5)?.as_str().parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    let word = dp.part_of_day.captures(phrase)?.get(1)?.as_str().to_lowercase();
    let hour = match word.as_str() {
        "midnight" => 0,
        "morning" => 9,
        "noon" => 12,
        "afternoon" => 15,
        _ => 18,
    };
    NaiveTime::from_hms_opt(hour, 0, 0)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
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

fn local_naive<Tz: TimeZone>(now: &DateTime<Tz>, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    now.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `day` moved by `days`, or `None` past the calendar bounds.
fn shift_days(day: NaiveDate, days: i64) -> Option<NaiveDate> {
    day.checked_add_signed(Duration::try_days(days)?)
}

fn local_at<Tz: TimeZone>(now: &DateTime<Tz>, day: NaiveDate, h: u32, m: u32) -> Option<DateTime<Utc>> {
    local_at_hms(now, day, h, m, 0)
}

fn local_at_hms<Tz: TimeZone>(
    now: &DateTime<Tz>,
    day: NaiveDate,
    h: u32,
    m: u32,
    s: u32,
) -> Option<DateTime<Utc>> {
    local_naive(now, day.and_time(NaiveTime::from_hms_opt(h, m, s)?))
}
