// ABOUTME: Stats engine maintaining monthly and yearly rollups against distance goals
// ABOUTME: Lazy period rollover on save, activity-date-aware contributions, manual edits and resets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Monthly and yearly rollups
//!
//! Accumulators are reset lazily: only when a run is saved and the period of the
//! previous save differs from the current period. A run only contributes to a
//! period it actually belongs to, so late webhook deliveries and backfills of
//! old activities cannot inflate the current month or year. Period boundaries
//! are taken on the athlete's local calendar, using the UTC offset carried by
//! the activity being applied.

use crate::dates::{month_key, same_month, same_year};
use crate::fields::{self, ManualEditReport};
use crate::models::{Activity, StatsState};
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Stateless rules for `StatsState`
pub struct StatsEngine;

impl StatsEngine {
    /// Apply a qualifying run to the rollups
    pub fn apply_run(state: &mut StatsState, activity: &Activity, now: DateTime<Utc>) {
        if state.manually_updated {
            debug!(activity_id = activity.id, "Stats in manual mode, skipping accumulation");
            state.last_updated = Some(now);
            return;
        }

        // Periods follow the athlete's local calendar, like the run date itself
        let run_date = activity.calendar_date();
        let today = activity.local_date_of(now).max(run_date);
        if let Some(last) = state.last_updated.map(|t| activity.local_date_of(t)) {
            if month_key(today) > month_key(last) {
                info!(previous = %last, current = %today, "Monthly rollover");
                Self::zero_monthly(state);
            }
            if today.year() > last.year() {
                info!(previous = %last, current = %today, "Yearly rollover");
                Self::zero_yearly(state);
            }
        }

        let distance = activity.distance_meters();
        let seconds = activity.duration_seconds();
        let elevation = activity.elevation_meters();

        if same_month(run_date, today) {
            state.monthly_distance_meters += distance;
            state.monthly_time_seconds = state.monthly_time_seconds.saturating_add(seconds);
            state.monthly_elevation_meters += elevation;
        } else {
            debug!(activity_id = activity.id, %run_date, "Run outside current month");
        }

        if same_year(run_date, today) {
            state.yearly_distance_meters += distance;
            state.yearly_time_seconds = state.yearly_time_seconds.saturating_add(seconds);
            state.yearly_elevation_meters += elevation;
        } else {
            debug!(activity_id = activity.id, %run_date, "Run outside current year");
        }

        state.last_updated = Some(now);
    }

    /// Overwrite recognized fields from an operator form
    ///
    /// Distance and goal inputs are kilometers. Manual mode is switched on unless
    /// the form sets `manuallyUpdated` explicitly.
    pub fn manual_edit(
        state: &mut StatsState,
        form: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> ManualEditReport {
        let report = fields::apply_stats_fields(state, form);
        if !report.applied.contains(&fields::MANUALLY_UPDATED) {
            state.manually_updated = true;
        }
        state.last_updated = Some(now);
        report
    }

    /// Zero the monthly accumulators and return to automatic mode
    pub fn reset_monthly(state: &mut StatsState, now: DateTime<Utc>) {
        Self::zero_monthly(state);
        state.manually_updated = false;
        state.last_updated = Some(now);
    }

    /// Zero the yearly accumulators and return to automatic mode
    pub fn reset_yearly(state: &mut StatsState, now: DateTime<Utc>) {
        Self::zero_yearly(state);
        state.manually_updated = false;
        state.last_updated = Some(now);
    }

    fn zero_monthly(state: &mut StatsState) {
        state.monthly_distance_meters = 0.0;
        state.monthly_time_seconds = 0;
        state.monthly_elevation_meters = 0.0;
    }

    fn zero_yearly(state: &mut StatsState) {
        state.yearly_distance_meters = 0.0;
        state.yearly_time_seconds = 0;
        state.yearly_elevation_meters = 0.0;
    }
}
