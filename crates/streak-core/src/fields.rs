// ABOUTME: Allow-list coercion tables for operator edits of streak and stats state
// ABOUTME: Maps form field names to typed setters with unit conversion and reports rejects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Operator edits arrive as string maps from HTML forms or the CLI. Each
//! recognized key has exactly one coercion; anything else is reported back
//! instead of being written into the state.

use crate::models::{StatsState, StreakState};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Meters per kilometer
pub const METERS_PER_KM: f64 = 1000.0;

/// Form key toggling manual mode, shared by both tables
pub const MANUALLY_UPDATED: &str = "manuallyUpdated";

/// A field value that could not be coerced
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum FieldError {
    /// Value is not a non-negative integer
    #[error("expected a non-negative integer, got '{0}'")]
    NotAnInteger(String),
    /// Value is not a finite, non-negative number
    #[error("expected a non-negative number, got '{0}'")]
    NotANumber(String),
    /// Value is not a boolean
    #[error("expected true/false, got '{0}'")]
    NotABoolean(String),
    /// Value is not a `YYYY-MM-DD` date
    #[error("expected a YYYY-MM-DD date, got '{0}'")]
    NotADate(String),
}

/// Outcome of a manual edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManualEditReport {
    /// Keys written into the state
    pub applied: Vec<&'static str>,
    /// Recognized keys whose values failed to coerce
    pub rejected: Vec<(String, FieldError)>,
    /// Keys not in the allow-list
    pub ignored: Vec<String>,
}

type Setter<S> = fn(&mut S, &str) -> Result<(), FieldError>;

/// Streak form keys and their coercions
pub const STREAK_FIELDS: &[(&str, Setter<StreakState>)] = &[
    ("currentStreak", |s, v| {
        s.current_streak = parse_count(v)?;
        Ok(())
    }),
    ("longestStreak", |s, v| {
        s.longest_streak = parse_count(v)?;
        Ok(())
    }),
    ("totalRuns", |s, v| {
        s.total_runs = parse_count(v)?;
        Ok(())
    }),
    ("totalDistance", |s, v| {
        s.total_distance_meters = parse_km(v)?;
        Ok(())
    }),
    ("totalTime", |s, v| {
        s.total_time_seconds = parse_seconds(v)?;
        Ok(())
    }),
    ("totalElevation", |s, v| {
        s.total_elevation_meters = parse_number(v)?;
        Ok(())
    }),
    ("streakStartDate", |s, v| {
        s.streak_start_date = parse_date(v)?;
        Ok(())
    }),
    ("lastRunDate", |s, v| {
        s.last_run_date = parse_date(v)?;
        Ok(())
    }),
    (MANUALLY_UPDATED, |s, v| {
        s.manually_updated = parse_bool(v)?;
        Ok(())
    }),
];

/// Stats form keys and their coercions
pub const STATS_FIELDS: &[(&str, Setter<StatsState>)] = &[
    ("monthlyDistance", |s, v| {
        s.monthly_distance_meters = parse_km(v)?;
        Ok(())
    }),
    ("monthlyTime", |s, v| {
        s.monthly_time_seconds = parse_seconds(v)?;
        Ok(())
    }),
    ("monthlyElevation", |s, v| {
        s.monthly_elevation_meters = parse_number(v)?;
        Ok(())
    }),
    ("yearlyDistance", |s, v| {
        s.yearly_distance_meters = parse_km(v)?;
        Ok(())
    }),
    ("yearlyTime", |s, v| {
        s.yearly_time_seconds = parse_seconds(v)?;
        Ok(())
    }),
    ("yearlyElevation", |s, v| {
        s.yearly_elevation_meters = parse_number(v)?;
        Ok(())
    }),
    ("monthlyGoal", |s, v| {
        s.monthly_goal_meters = parse_km(v)?;
        Ok(())
    }),
    ("yearlyGoal", |s, v| {
        s.yearly_goal_meters = parse_km(v)?;
        Ok(())
    }),
    (MANUALLY_UPDATED, |s, v| {
        s.manually_updated = parse_bool(v)?;
        Ok(())
    }),
];

/// Apply a form to a streak state using `STREAK_FIELDS`
pub fn apply_streak_fields(
    state: &mut StreakState,
    form: &HashMap<String, String>,
) -> ManualEditReport {
    apply_table(state, form, STREAK_FIELDS)
}

/// Apply a form to a stats state using `STATS_FIELDS`
pub fn apply_stats_fields(
    state: &mut StatsState,
    form: &HashMap<String, String>,
) -> ManualEditReport {
    apply_table(state, form, STATS_FIELDS)
}

fn apply_table<S>(
    state: &mut S,
    form: &HashMap<String, String>,
    table: &[(&'static str, Setter<S>)],
) -> ManualEditReport {
    let mut report = ManualEditReport::default();

    let mut keys: Vec<&String> = form.keys().collect();
    keys.sort();

    for key in keys {
        let value = form.get(key).map_or("", |v| v.trim());
        let Some((name, setter)) = table.iter().find(|(name, _)| *name == key.as_str()) else {
            report.ignored.push(key.clone());
            continue;
        };
        // Blank inputs mean "leave unchanged", except for dates where blank clears
        if value.is_empty() && !name.ends_with("Date") {
            continue;
        }
        match setter(state, value) {
            Ok(()) => report.applied.push(*name),
            Err(e) => {
                tracing::warn!(field = %name, error = %e, "Ignoring invalid manual edit value");
                report.rejected.push(((*name).to_owned(), e));
            }
        }
    }

    report
}

/// Parse a non-negative integer count
///
/// # Errors
///
/// Returns `FieldError::NotAnInteger` when the value is not a `u32`
pub fn parse_count(value: &str) -> Result<u32, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::NotAnInteger(value.to_owned()))
}

/// Parse a non-negative number of seconds, accepting fractional input by truncation
///
/// # Errors
///
/// Returns `FieldError::NotANumber` when the value is not a non-negative number
pub fn parse_seconds(value: &str) -> Result<u64, FieldError> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(secs);
    }
    let secs = parse_number(value)?;
    Ok(secs.trunc() as u64)
}

/// Parse a finite non-negative number
///
/// # Errors
///
/// Returns `FieldError::NotANumber` when parsing fails or the value is negative
pub fn parse_number(value: &str) -> Result<f64, FieldError> {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(FieldError::NotANumber(value.to_owned())),
    }
}

/// Parse kilometers and convert to meters
///
/// # Errors
///
/// Returns `FieldError::NotANumber` when the value is not a non-negative number
pub fn parse_km(value: &str) -> Result<f64, FieldError> {
    parse_number(value).map(|km| km * METERS_PER_KM)
}

/// Parse a form boolean (`true`/`false`, `on`/`off`, `1`/`0`, `yes`/`no`)
///
/// # Errors
///
/// Returns `FieldError::NotABoolean` for any other input
pub fn parse_bool(value: &str) -> Result<bool, FieldError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        _ => Err(FieldError::NotABoolean(value.to_owned())),
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank clears it
///
/// # Errors
///
/// Returns `FieldError::NotADate` when the value is not a valid date
pub fn parse_date(value: &str) -> Result<Option<NaiveDate>, FieldError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FieldError::NotADate(value.to_owned()))
}
