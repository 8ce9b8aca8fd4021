// ABOUTME: Calendar comparison helpers and clock abstraction
// ABOUTME: Same-day/month/year checks, signed day differences, and injectable time sources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// True when both dates are the same calendar day
#[must_use]
pub fn same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

/// True when both dates fall in the same calendar month of the same year
#[must_use]
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    month_key(a) == month_key(b)
}

/// True when both dates fall in the same calendar year
#[must_use]
pub fn same_year(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year()
}

/// Signed number of calendar days from `from` to `to`
///
/// Positive when `to` is later than `from`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `(year, month)` key of the period a date belongs to
#[must_use]
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Source of the current time
///
/// Engines take explicit dates; orchestration code asks a `Clock` so tests can
/// pin "now" without touching the system time.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
