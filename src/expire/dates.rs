// src/expire/dates.rs

//! Calendar arithmetic behind the expiration policies.
//!
//! All functions work on naive local datetimes and take "now" explicitly so
//! they stay deterministic under test.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// How many months past the current one `next_month_day` will look.
const MONTH_SEARCH_WINDOW: u32 = 12;

/// Shift by whole months, clamping the day to the target month's last day.
///
/// `2025-01-31 + 1 month` is `2025-02-28`. Returns `None` only when the
/// result falls outside chrono's representable range.
pub fn add_months(dt: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    if months >= 0 {
        dt.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        dt.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt().map(|d| d.day())
}

/// Midnight of the nearest listed weekday strictly after today.
///
/// If today is one of `weekdays`, that weekday resolves to next week's
/// occurrence, never to today.
pub fn next_weekday_midnight(now: NaiveDateTime, weekdays: &[Weekday]) -> Option<NaiveDateTime> {
    let today = now.date();
    let current = i64::from(today.weekday().num_days_from_monday());

    weekdays
        .iter()
        .filter_map(|wd| {
            let target = i64::from(wd.num_days_from_monday());
            let mut ahead = (target - current).rem_euclid(7);
            if ahead == 0 {
                ahead = 7;
            }
            today
                .checked_add_days(Days::new(ahead.unsigned_abs()))
                .map(midnight)
        })
        .min()
}

/// Midnight of the nearest listed day-of-month strictly after today's
/// midnight.
///
/// The current month is searched first, then following months. Days that do
/// not exist in a searched month (e.g. the 31st in April) are skipped.
pub fn next_month_day(now: NaiveDateTime, days: &[u32]) -> Option<NaiveDateTime> {
    let today_midnight = midnight(now.date());
    let first_of_month = now.date().with_day(1)?;

    let mut sorted: Vec<u32> = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    for offset in 0..=MONTH_SEARCH_WINDOW {
        let month_start = first_of_month.checked_add_months(Months::new(offset))?;
        let last = last_day_of_month(month_start.year(), month_start.month())?;

        for &day in &sorted {
            if day == 0 || day > last {
                continue;
            }
            let candidate = midnight(month_start.with_day(day)?);
            if candidate > today_midnight {
                return Some(candidate);
            }
        }
    }

    None
}

/// Parse a weekday name: full (`"monday"`) or a 2–3 letter prefix
/// (`"mo"`, `"mon"`), case-insensitive.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    const NAMES: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];

    let lowered = name.trim().to_lowercase();
    let len = lowered.len();

    NAMES.iter().find_map(|(full, wd)| {
        let matches = lowered == *full || ((2..=3).contains(&len) && full.starts_with(&lowered));
        matches.then_some(*wd)
    })
}

/// Whole seconds from `now` until `target`, truncated toward zero.
///
/// Negative when `target` is in the past.
pub fn seconds_until(now: NaiveDateTime, target: NaiveDateTime) -> i64 {
    (target - now).num_seconds()
}
