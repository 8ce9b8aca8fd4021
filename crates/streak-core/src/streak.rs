// ABOUTME: Streak engine maintaining consecutive-day counts and lifetime totals
// ABOUTME: Applies runs with dedup and manual-freeze guards, operator edits, and resets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Streak transitions
//!
//! A run is applied against the previous `StreakState` as follows:
//!
//! 1. Duplicate of the watermark: nothing changes (`AlreadyProcessed`).
//! 2. Manual mode: nothing changes (`ManualFreeze`).
//! 3. Otherwise lifetime totals grow and the streak moves by the day gap
//!    between the run and `last_run_date`.
//!
//! Day arithmetic always uses the run's own calendar date.

use crate::dates::days_between;
use crate::fields::{self, ManualEditReport};
use crate::models::{Activity, LastProcessedActivity, QualifyingRule, StreakState};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Result of applying a run to the streak state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Totals and streak were updated
    Applied,
    /// The run matches the watermark; state left unchanged
    AlreadyProcessed,
    /// Manual mode is on; state left unchanged
    ManualFreeze,
}

/// Stateless rules for `StreakState`
pub struct StreakEngine;

impl StreakEngine {
    /// Apply a qualifying run to the streak state
    ///
    /// `ran_yesterday` reports whether a lookback query found a qualifying run on
    /// the day before this run, independent of `last_run_date`.
    pub fn apply_run(
        state: &mut StreakState,
        activity: &Activity,
        watermark: Option<&LastProcessedActivity>,
        rule: &QualifyingRule,
        ran_yesterday: bool,
    ) -> RunOutcome {
        if Self::is_duplicate(activity, watermark, rule) {
            debug!(activity_id = activity.id, "Run already processed");
            return RunOutcome::AlreadyProcessed;
        }

        if state.manually_updated {
            debug!(
                activity_id = activity.id,
                "Streak in manual mode, skipping update"
            );
            return RunOutcome::ManualFreeze;
        }

        state.total_runs = state.total_runs.saturating_add(1);
        state.total_distance_meters += activity.distance_meters();
        state.total_time_seconds = state
            .total_time_seconds
            .saturating_add(activity.duration_seconds());
        state.total_elevation_meters += activity.elevation_meters();

        let run_date = activity.calendar_date();
        Self::advance_streak(state, run_date, ran_yesterday);

        RunOutcome::Applied
    }

    /// Move the streak counter for a run on `run_date`
    fn advance_streak(state: &mut StreakState, run_date: NaiveDate, ran_yesterday: bool) {
        match state.last_run_date {
            None => {
                state.current_streak = 1;
                state.streak_start_date = Some(run_date);
            }
            Some(last) => {
                let gap = days_between(last, run_date);
                if gap <= 0 {
                    // Same day already counted, or a late run from before the last one
                    return;
                }
                if gap == 1 || ran_yesterday {
                    state.current_streak = state.current_streak.saturating_add(1);
                    if state.streak_start_date.is_none() {
                        state.streak_start_date = Some(run_date);
                    }
                } else {
                    state.current_streak = 1;
                    state.streak_start_date = Some(run_date);
                }
            }
        }

        state.longest_streak = state.longest_streak.max(state.current_streak);
        state.last_run_date = Some(run_date);
    }

    /// Whether the run was already accepted
    ///
    /// Matches the watermark by ID, or by calendar day when the watermark was
    /// itself a qualifying run under `rule`. A non-run logged earlier the same
    /// day does not count.
    #[must_use]
    pub fn is_duplicate(
        activity: &Activity,
        watermark: Option<&LastProcessedActivity>,
        rule: &QualifyingRule,
    ) -> bool {
        let Some(mark) = watermark else {
            return false;
        };
        if mark.id == activity.id {
            return true;
        }
        mark.qualified_under(rule) && mark.day() == activity.calendar_date()
    }

    /// Overwrite recognized fields from an operator form
    ///
    /// Unknown keys and values that fail to coerce are reported, not applied.
    pub fn manual_edit(
        state: &mut StreakState,
        form: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> ManualEditReport {
        let report = fields::apply_streak_fields(state, form);
        if !report.applied.contains(&fields::MANUALLY_UPDATED) {
            state.manually_updated = true;
        }
        state.longest_streak = state.longest_streak.max(state.current_streak);
        state.last_manual_update = Some(now);
        report
    }

    /// Zero every counter and clear dates, returning to automatic mode
    pub fn reset(state: &mut StreakState) {
        *state = StreakState::default();
    }
}
