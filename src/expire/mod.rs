// src/expire/mod.rs

//! Expiration policies for checkpointed results.
//!
//! A policy is evaluated when a task's result is written and yields either a
//! time-to-live in seconds or `None`. `None` means the store never expires
//! the entry by itself; deletion, if any, is driven by the
//! [`DeferredDeletions`] registry (`after_session`, `on_complete`).
//!
//! Every policy is a function of "now". [`ExpirationPolicy::ttl`] uses the
//! local clock, [`ExpirationPolicy::ttl_at`] takes the instant explicitly.

pub mod dates;
pub mod deferred;

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use tracing::debug;

use crate::errors::{CheckflowError, Result};

pub use dates::{add_months, next_month_day, next_weekday_midnight, parse_weekday};
pub use deferred::DeferredDeletions;

type PolicyFn = dyn Fn(NaiveDateTime) -> Result<Option<i64>> + Send + Sync;

/// A named, cloneable TTL calculator.
#[derive(Clone)]
pub struct ExpirationPolicy {
    name: &'static str,
    calc: Arc<PolicyFn>,
}

impl fmt::Debug for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationPolicy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ExpirationPolicy {
    /// Wrap an arbitrary calculation as a policy.
    pub fn custom<F>(name: &'static str, calc: F) -> Self
    where
        F: Fn(NaiveDateTime) -> Result<Option<i64>> + Send + Sync + 'static,
    {
        Self {
            name,
            calc: Arc::new(calc),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Seconds until expiry, measured from the local clock.
    pub fn ttl(&self) -> Result<Option<i64>> {
        self.ttl_at(Local::now().naive_local())
    }

    /// Seconds until expiry, measured from `now`.
    pub fn ttl_at(&self, now: NaiveDateTime) -> Result<Option<i64>> {
        let ttl = (self.calc)(now)?;
        debug!(policy = self.name, ttl = ?ttl, "computed expiry (seconds)");
        Ok(ttl)
    }
}

/// Relative calendar offset used by [`from_now`] and [`from_today`].
///
/// Years and months are applied first, with day-of-month clamping; the
/// fixed-length parts (weeks through seconds) are added afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub years: i32,
    pub months: i32,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Offset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn years(mut self, n: i32) -> Self {
        self.years = n;
        self
    }

    pub fn months(mut self, n: i32) -> Self {
        self.months = n;
        self
    }

    pub fn weeks(mut self, n: i64) -> Self {
        self.weeks = n;
        self
    }

    pub fn days(mut self, n: i64) -> Self {
        self.days = n;
        self
    }

    pub fn hours(mut self, n: i64) -> Self {
        self.hours = n;
        self
    }

    pub fn minutes(mut self, n: i64) -> Self {
        self.minutes = n;
        self
    }

    pub fn seconds(mut self, n: i64) -> Self {
        self.seconds = n;
        self
    }

    /// `base` shifted by this offset.
    pub fn apply(&self, base: NaiveDateTime) -> Result<NaiveDateTime> {
        let total_months = self
            .years
            .checked_mul(12)
            .and_then(|y| y.checked_add(self.months))
            .ok_or_else(|| CheckflowError::Policy(format!("offset out of range: {self:?}")))?;

        let delta = TimeDelta::try_weeks(self.weeks)
            .zip(TimeDelta::try_days(self.days))
            .zip(TimeDelta::try_hours(self.hours))
            .zip(TimeDelta::try_minutes(self.minutes))
            .zip(TimeDelta::try_seconds(self.seconds))
            .and_then(|((((w, d), h), m), s)| {
                w.checked_add(&d)?
                    .checked_add(&h)?
                    .checked_add(&m)?
                    .checked_add(&s)
            });

        add_months(base, total_months)
            .zip(delta)
            .and_then(|(shifted, delta)| shifted.checked_add_signed(delta))
            .ok_or_else(|| CheckflowError::Policy(format!("offset out of range: {self:?}")))
    }
}

/// Never expires.
pub fn never() -> ExpirationPolicy {
    ExpirationPolicy::custom("never", |_| Ok(None))
}

/// Expires at the next local midnight.
pub fn at_midnight() -> ExpirationPolicy {
    ExpirationPolicy::custom("at_midnight", |now| {
        let tomorrow = now
            .date()
            .succ_opt()
            .ok_or_else(|| CheckflowError::Policy("date out of range".to_string()))?;
        Ok(Some(dates::seconds_until(now, dates::midnight(tomorrow))))
    })
}

/// Expires at midnight on the next listed day of the month.
///
/// Days that a given month lacks (e.g. 31 in April) are skipped for that
/// month. Fails when `days` is empty or contains a value outside `1..=31`.
pub fn monthly(days: &[u32]) -> Result<ExpirationPolicy> {
    if days.is_empty() {
        return Err(CheckflowError::Policy(
            "monthly() needs at least one day of the month".to_string(),
        ));
    }
    if let Some(bad) = days.iter().find(|d| !(1..=31).contains(*d)) {
        return Err(CheckflowError::Policy(format!(
            "monthly() day must be within 1..=31 (got {bad})"
        )));
    }

    let days = days.to_vec();
    Ok(ExpirationPolicy::custom("monthly", move |now| {
        let target = next_month_day(now, &days).ok_or_else(|| {
            CheckflowError::Policy(format!("no valid day of month among {days:?} after {now}"))
        })?;
        Ok(Some(dates::seconds_until(now, target)))
    }))
}

/// Expires at midnight on the next listed weekday, strictly after today.
///
/// Names are case-insensitive and may be full (`"Monday"`) or abbreviated to
/// two or three letters (`"mo"`, `"Mon"`).
pub fn weekly<S: AsRef<str>>(days: &[S]) -> Result<ExpirationPolicy> {
    if days.is_empty() {
        return Err(CheckflowError::Policy(
            "weekly() needs at least one weekday".to_string(),
        ));
    }

    let weekdays = days
        .iter()
        .map(|d| {
            parse_weekday(d.as_ref()).ok_or_else(|| {
                CheckflowError::Policy(format!("unrecognised weekday: '{}'", d.as_ref()))
            })
        })
        .collect::<Result<Vec<Weekday>>>()?;

    Ok(ExpirationPolicy::custom("weekly", move |now| {
        let target = next_weekday_midnight(now, &weekdays)
            .ok_or_else(|| CheckflowError::Policy("date out of range".to_string()))?;
        Ok(Some(dates::seconds_until(now, target)))
    }))
}

/// Expires `offset` after the moment the result is written.
pub fn from_now(offset: Offset) -> ExpirationPolicy {
    ExpirationPolicy::custom("from_now", move |now| {
        let target = offset.apply(now)?;
        Ok(Some(dates::seconds_until(now, target)))
    })
}

/// TTL of `offset`, measured from the most recent local midnight.
///
/// The result depends only on the date of `now`, never on its time of day.
pub fn from_today(offset: Offset) -> ExpirationPolicy {
    ExpirationPolicy::custom("from_today", move |now| {
        let today = dates::midnight(now.date());
        let target = offset.apply(today)?;
        Ok(Some(dates::seconds_until(today, target)))
    })
}

/// Expires at a fixed instant. Yields a negative TTL once `target` has passed.
pub fn at_datetime(target: NaiveDateTime) -> ExpirationPolicy {
    ExpirationPolicy::custom("at_datetime", move |now| {
        Ok(Some(dates::seconds_until(now, target)))
    })
}

/// [`at_datetime`] at midnight of `date`.
pub fn at_date(date: NaiveDate) -> ExpirationPolicy {
    at_datetime(dates::midnight(date))
}

/// Deletes the task's checkpoint at process teardown, see
/// [`end_session`](crate::pipeline::end_session).
pub fn after_session(deferred: &DeferredDeletions, task: &str) -> ExpirationPolicy {
    deferred.register_after_session(task);
    ExpirationPolicy::custom("after_session", |_| Ok(None))
}

/// Deletes the task's checkpoint in the cleanup phase of each pipeline run.
pub fn on_complete(deferred: &DeferredDeletions, task: &str) -> ExpirationPolicy {
    deferred.register_on_complete(task);
    ExpirationPolicy::custom("on_complete", |_| Ok(None))
}
