//! Datetime and duration extraction.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, TimeZone};
use regex::Regex;

/// UTC+9, the game's publishing region.
pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid fixed offset")
}

static DATETIME_KANJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})月(\d{1,2})日[^\d:：.]*(\d{1,2})[:．.](\d{2})").unwrap());
static DATETIME_SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})\s*(\d{1,2})[:．.](\d{2})").unwrap());
static DATETIME_DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})-(\d{1,2})\s*(\d{1,2})[:．.](\d{2})").unwrap());

/// Scan `text` for a played-at timestamp, trying the three regexes in
/// order. Attaches the current year in UTC+9; rolls back one year if the
/// resulting timestamp is in the future relative to `now`.
pub fn extract_played_at(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    for re in [&*DATETIME_KANJI_RE, &*DATETIME_SLASH_RE, &*DATETIME_DASH_RE] {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let hour: u32 = caps[3].parse().ok()?;
        let minute: u32 = caps[4].parse().ok()?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
            continue;
        }

        let year = now.year();
        let Some(candidate) = build_timestamp(year, month, day, hour, minute) else {
            continue;
        };

        let candidate = if candidate > now {
            build_timestamp(year - 1, month, day, hour, minute)?
        } else {
            candidate
        };

        return Some(candidate);
    }
    None
}

fn build_timestamp(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
    jst()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
}

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"使用時間\s*[：:\s]*(\d{1,2})[:．.](\d{2})").unwrap());
static DURATION_ALT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"時間\s*[：:\s]*(\d{1,2})[:．.](\d{2})").unwrap());

/// Scan `text` for a match duration in `M:SS` form. Rejects minutes > 15.
pub fn extract_duration(text: &str) -> Option<String> {
    for re in [&*DURATION_RE, &*DURATION_ALT_RE] {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let minutes: u32 = caps[1].parse().ok()?;
        let seconds: u32 = caps[2].parse().ok()?;
        if minutes > 15 || seconds > 59 {
            continue;
        }
        return Some(format!("{}:{:02}", minutes, seconds));
    }
    None
}
