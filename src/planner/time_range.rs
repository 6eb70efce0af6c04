//! Time-range extraction from free text
//!
//! Only explicit phrases produce a range. Callers that need one fall back to
//! [`DEFAULT_RANGE_DAYS`] at the point of use.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_RANGE_DAYS: i64 = 30;

lazy_static! {
    static ref LAST_N_UNITS: Regex =
        Regex::new(r"\b(?:last|past)\s+(\d{1,4})\s+(day|week|month|year)s?\b").expect("valid regex");
    static ref MONTH_YEAR: Regex = Regex::new(
        r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{4})\b"
    )
    .expect("valid regex");
    static ref LAST_UNIT: Regex =
        Regex::new(r"\b(?:last|past)\s+(week|month|year)\b").expect("valid regex");
    static ref SINGLE_DAY: Regex = Regex::new(r"\b(yesterday|today)\b").expect("valid regex");
}

/// Words that hint at a time window even when no range can be extracted
const TIME_HINTS: &[&str] = &[
    "recent", "recently", "latest", "daily", "weekly", "monthly", "week", "month", "year",
    "quarter",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `[now - days, now]`
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// One calendar day, 00:00:00 through 23:59:59 UTC
    pub fn day(date: NaiveDate) -> Option<Self> {
        Some(Self {
            start: Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?),
            end: Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59)?),
        })
    }

    /// Whole calendar month, first day 00:00:00 through last day 23:59:59 UTC
    pub fn calendar_month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let last = next_first.pred_opt()?;

        Some(Self {
            start: Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
            end: Utc.from_utc_datetime(&last.and_hms_opt(23, 59, 59)?),
        })
    }

    /// The extracted range, or the default trailing window
    pub fn or_default(range: Option<TimeRange>, now: DateTime<Utc>) -> Self {
        range.unwrap_or_else(|| Self::last_days(now, DEFAULT_RANGE_DAYS))
    }

    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Extract an explicit time range from `text`, relative to `now`
pub fn extract_time_range(text: &str, now: DateTime<Utc>) -> Option<TimeRange> {
    let lowered = text.to_lowercase();

    if let Some(caps) = LAST_N_UNITS.captures(&lowered) {
        if let Ok(count) = caps[1].parse::<i64>() {
            let days = match &caps[2] {
                "day" => count,
                "week" => count * 7,
                "month" => count * 30,
                _ => count * 365,
            };
            return Some(TimeRange::last_days(now, days));
        }
    }

    if let Some(caps) = MONTH_YEAR.captures(&lowered) {
        let month = month_number(&caps[1]);
        let year = caps[2].parse::<i32>().ok();
        if let (Some(month), Some(year)) = (month, year) {
            if let Some(range) = TimeRange::calendar_month(year, month) {
                return Some(range);
            }
        }
    }

    if let Some(caps) = LAST_UNIT.captures(&lowered) {
        let days = match &caps[1] {
            "week" => 7,
            "month" => 30,
            _ => 365,
        };
        return Some(TimeRange::last_days(now, days));
    }

    if let Some(caps) = SINGLE_DAY.captures(&lowered) {
        let today = now.date_naive();
        let date = if &caps[1] == "yesterday" {
            today.pred_opt()?
        } else {
            today
        };
        return TimeRange::day(date);
    }

    None
}

/// True when the text carries any time reference, extractable or not
pub fn mentions_time(text: &str, extracted: Option<&TimeRange>) -> bool {
    if extracted.is_some() {
        return true;
    }

    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| TIME_HINTS.contains(&word))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(month)
}
