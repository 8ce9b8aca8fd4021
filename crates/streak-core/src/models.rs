// ABOUTME: Data model for streak tracking: activities, streak/stats state, and the dedup watermark
// ABOUTME: Persisted records serialize with camelCase names and tolerate missing fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default monthly distance goal in meters (200 km)
pub const DEFAULT_MONTHLY_GOAL_METERS: f64 = 200_000.0;

/// Default yearly distance goal in meters (2000 km)
pub const DEFAULT_YEARLY_GOAL_METERS: f64 = 2_000_000.0;

/// Activity as delivered by the fitness API
///
/// Read-only input to the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Provider activity ID
    pub id: u64,
    /// Activity title
    #[serde(default)]
    pub name: String,
    /// Provider activity type (e.g. "Run", "Ride", "Walk")
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Start instant in UTC
    pub start_date: DateTime<Utc>,
    /// Start wall-clock time in the athlete's timezone, tagged as UTC by the provider
    #[serde(default)]
    pub start_date_local: Option<DateTime<Utc>>,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: Option<u64>,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    /// Total elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    /// Current description text
    #[serde(default)]
    pub description: Option<String>,
}

impl Activity {
    /// Calendar date the activity counts for
    ///
    /// Uses the local start time when the provider sent one so that an evening
    /// run does not land on the next UTC day.
    #[must_use]
    pub fn calendar_date(&self) -> NaiveDate {
        self.start_date_local
            .unwrap_or(self.start_date)
            .date_naive()
    }

    /// Offset of the athlete's local clock from UTC at the activity start
    ///
    /// Zero when the provider sent no local start time.
    #[must_use]
    pub fn utc_offset(&self) -> Duration {
        self.start_date_local
            .map_or_else(Duration::zero, |local| local - self.start_date)
    }

    /// Calendar date of `instant` on the athlete's local clock
    #[must_use]
    pub fn local_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        (instant + self.utc_offset()).date_naive()
    }

    /// Duration in seconds: moving time, then elapsed time, then zero
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        self.moving_time.or(self.elapsed_time).unwrap_or(0)
    }

    /// Elevation gain in meters, zero when absent
    #[must_use]
    pub fn elevation_meters(&self) -> f64 {
        self.total_elevation_gain.unwrap_or(0.0)
    }

    /// Distance in meters, clamped to non-negative finite values
    #[must_use]
    pub fn distance_meters(&self) -> f64 {
        if self.distance.is_finite() && self.distance > 0.0 {
            self.distance
        } else {
            0.0
        }
    }
}

/// Predicate deciding which activities count toward the streak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyingRule {
    /// Activity types that count (exact, case-sensitive provider names)
    pub activity_types: Vec<String>,
    /// Minimum distance in meters
    pub min_distance_meters: f64,
}

impl Default for QualifyingRule {
    fn default() -> Self {
        Self {
            activity_types: vec!["Run".to_owned()],
            min_distance_meters: 0.0,
        }
    }
}

impl QualifyingRule {
    /// Whether the activity is a qualifying run
    #[must_use]
    pub fn qualifies(&self, activity: &Activity) -> bool {
        self.is_run_type(&activity.activity_type)
            && activity.distance_meters() >= self.min_distance_meters
    }

    /// Whether the activity type alone is a run type
    #[must_use]
    pub fn is_run_type(&self, activity_type: &str) -> bool {
        self.activity_types.iter().any(|t| t == activity_type)
    }
}

/// Consecutive-day streak and lifetime totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakState {
    /// Days in the current streak
    pub current_streak: u32,
    /// Longest streak ever reached
    pub longest_streak: u32,
    /// Lifetime number of counted runs
    pub total_runs: u32,
    /// Lifetime distance in meters
    pub total_distance_meters: f64,
    /// Lifetime moving time in seconds
    pub total_time_seconds: u64,
    /// Lifetime elevation gain in meters
    pub total_elevation_meters: f64,
    /// First day of the current streak
    pub streak_start_date: Option<NaiveDate>,
    /// Calendar date of the latest counted run
    pub last_run_date: Option<NaiveDate>,
    /// Automatic accumulation is suspended while set
    pub manually_updated: bool,
    /// When an operator last edited the state
    pub last_manual_update: Option<DateTime<Utc>>,
}

impl Default for StreakState {
    fn default() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            total_runs: 0,
            total_distance_meters: 0.0,
            total_time_seconds: 0,
            total_elevation_meters: 0.0,
            streak_start_date: None,
            last_run_date: None,
            manually_updated: false,
            last_manual_update: None,
        }
    }
}

/// Monthly and yearly rollups against distance goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsState {
    /// Distance this month in meters
    pub monthly_distance_meters: f64,
    /// Moving time this month in seconds
    pub monthly_time_seconds: u64,
    /// Elevation gain this month in meters
    pub monthly_elevation_meters: f64,
    /// Distance this year in meters
    pub yearly_distance_meters: f64,
    /// Moving time this year in seconds
    pub yearly_time_seconds: u64,
    /// Elevation gain this year in meters
    pub yearly_elevation_meters: f64,
    /// Monthly distance target in meters
    pub monthly_goal_meters: f64,
    /// Yearly distance target in meters
    pub yearly_goal_meters: f64,
    /// Automatic accumulation is suspended while set
    pub manually_updated: bool,
    /// Last time the rollups were touched
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for StatsState {
    fn default() -> Self {
        Self {
            monthly_distance_meters: 0.0,
            monthly_time_seconds: 0,
            monthly_elevation_meters: 0.0,
            yearly_distance_meters: 0.0,
            yearly_time_seconds: 0,
            yearly_elevation_meters: 0.0,
            monthly_goal_meters: DEFAULT_MONTHLY_GOAL_METERS,
            yearly_goal_meters: DEFAULT_YEARLY_GOAL_METERS,
            manually_updated: false,
            last_updated: None,
        }
    }
}

impl StatsState {
    /// Fresh state with explicit goals
    #[must_use]
    pub fn with_goals(monthly_goal_meters: f64, yearly_goal_meters: f64) -> Self {
        Self {
            monthly_goal_meters,
            yearly_goal_meters,
            ..Self::default()
        }
    }

    /// Monthly distance as a percentage of the monthly goal
    #[must_use]
    pub fn monthly_percent(&self) -> f64 {
        percent_of(self.monthly_distance_meters, self.monthly_goal_meters)
    }

    /// Yearly distance as a percentage of the yearly goal
    #[must_use]
    pub fn yearly_percent(&self) -> f64 {
        percent_of(self.yearly_distance_meters, self.yearly_goal_meters)
    }
}

fn percent_of(value: f64, goal: f64) -> f64 {
    if goal > 0.0 {
        value / goal * 100.0
    } else {
        0.0
    }
}

/// Streak, stats, and the watermark persisted as one record so they are written together
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreakRecord {
    /// Streak state
    pub streak: StreakState,
    /// Rollup state
    pub stats: StatsState,
    /// Last accepted activity
    pub last_processed: Option<LastProcessedActivity>,
}

/// The last activity accepted by ingestion, used to skip reprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastProcessedActivity {
    /// Provider activity ID
    pub id: u64,
    /// Activity start instant
    pub date: DateTime<Utc>,
    /// Provider activity type
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Distance in meters
    pub distance_meters: f64,
    /// Calendar date the activity counted for
    #[serde(default)]
    pub calendar_date: Option<NaiveDate>,
}

impl LastProcessedActivity {
    /// Watermark for an accepted activity
    #[must_use]
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            date: activity.start_date,
            activity_type: activity.activity_type.clone(),
            distance_meters: activity.distance_meters(),
            calendar_date: Some(activity.calendar_date()),
        }
    }

    /// Calendar date of the watermark activity
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.calendar_date.unwrap_or_else(|| self.date.date_naive())
    }

    /// Whether the watermark activity was itself a qualifying run
    #[must_use]
    pub fn qualified_under(&self, rule: &QualifyingRule) -> bool {
        rule.is_run_type(&self.activity_type) && self.distance_meters >= rule.min_distance_meters
    }
}
