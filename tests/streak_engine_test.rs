// ABOUTME: Integration tests for streak transitions, dedup, manual mode, and manual edits
// ABOUTME: Exercises StreakEngine through sequences of runs the way ingestion drives it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{activity, morning, run};
use std::collections::HashMap;
use streak_core::{
    LastProcessedActivity, QualifyingRule, RunOutcome, StreakEngine, StreakState,
};

/// Apply a run and advance the watermark like the ingestor does
fn ingest(
    state: &mut StreakState,
    watermark: &mut Option<LastProcessedActivity>,
    activity: &streak_core::Activity,
) -> RunOutcome {
    let rule = QualifyingRule::default();
    let outcome = StreakEngine::apply_run(state, activity, watermark.as_ref(), &rule, false);
    if outcome != RunOutcome::AlreadyProcessed {
        *watermark = Some(LastProcessedActivity::from_activity(activity));
    }
    outcome
}

#[test]
fn test_consecutive_days_count_up() {
    let mut state = StreakState::default();
    let mut watermark = None;

    for day in 1..=10 {
        let outcome = ingest(&mut state, &mut watermark, &run(u64::from(day), 2025, 3, day, 5.0));
        assert_eq!(outcome, RunOutcome::Applied);
        assert_eq!(state.current_streak, day);
        assert_eq!(state.longest_streak, state.current_streak);
    }
    assert_eq!(state.streak_start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
    assert_eq!(state.total_runs, 10);
}

#[test]
fn test_same_activity_twice_changes_nothing() {
    let mut state = StreakState::default();
    let mut watermark = None;
    let first = run(1, 2025, 3, 1, 5.0);

    ingest(&mut state, &mut watermark, &first);
    let snapshot = state.clone();
    let outcome = ingest(&mut state, &mut watermark, &first);

    assert_eq!(outcome, RunOutcome::AlreadyProcessed);
    assert_eq!(state, snapshot);
}

#[test]
fn test_second_run_same_day_is_already_processed() {
    let mut state = StreakState::default();
    let mut watermark = None;

    ingest(&mut state, &mut watermark, &run(1, 2025, 3, 1, 5.0));
    let outcome = ingest(&mut state, &mut watermark, &run(2, 2025, 3, 1, 3.0));

    assert_eq!(outcome, RunOutcome::AlreadyProcessed);
    assert_eq!(state.total_runs, 1);
}

#[test]
fn test_gap_resets_streak() {
    let mut state = StreakState::default();
    let mut watermark = None;
    for day in 1..=4 {
        ingest(&mut state, &mut watermark, &run(u64::from(day), 2025, 3, day, 5.0));
    }

    ingest(&mut state, &mut watermark, &run(10, 2025, 3, 7, 5.0));

    assert_eq!(state.current_streak, 1);
    assert_eq!(state.longest_streak, 4);
    assert_eq!(state.streak_start_date, NaiveDate::from_ymd_opt(2025, 3, 7));
    assert_eq!(state.last_run_date, NaiveDate::from_ymd_opt(2025, 3, 7));
}

#[test]
fn test_lookback_run_yesterday_continues_streak() {
    let mut state = StreakState::default();
    let rule = QualifyingRule::default();
    StreakEngine::apply_run(&mut state, &run(1, 2025, 3, 1, 5.0), None, &rule, false);

    let outcome = StreakEngine::apply_run(&mut state, &run(2, 2025, 3, 4, 5.0), None, &rule, true);

    assert_eq!(outcome, RunOutcome::Applied);
    assert_eq!(state.current_streak, 2);
}

#[test]
fn test_manual_mode_freezes_counters() {
    let mut state = StreakState {
        current_streak: 30,
        longest_streak: 45,
        total_runs: 300,
        total_distance_meters: 2_500_000.0,
        manually_updated: true,
        last_run_date: NaiveDate::from_ymd_opt(2025, 2, 28),
        ..StreakState::default()
    };
    let snapshot = state.clone();
    let mut watermark = None;

    for day in 1..=5 {
        let outcome = ingest(&mut state, &mut watermark, &run(u64::from(day), 2025, 3, day, 8.0));
        assert_eq!(outcome, RunOutcome::ManualFreeze);
    }

    assert_eq!(state, snapshot);
    assert_eq!(watermark.map(|w| w.id), Some(5));
}

#[test]
fn test_run_after_yesterday_extends_streak_end_to_end() {
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);
    let mut state = StreakState {
        current_streak: 5,
        longest_streak: 5,
        last_run_date: Some(yesterday),
        streak_start_date: Some(today - Duration::days(5)),
        ..StreakState::default()
    };

    let mut today_run = run(99, 2025, 1, 1, 10.0);
    today_run.start_date = Utc::now();
    today_run.start_date_local = None;
    today_run.moving_time = Some(3000);
    today_run.total_elevation_gain = Some(100.0);

    let rule = QualifyingRule::default();
    let outcome = StreakEngine::apply_run(&mut state, &today_run, None, &rule, false);

    assert_eq!(outcome, RunOutcome::Applied);
    assert_eq!(state.current_streak, 6);
    assert_eq!(state.longest_streak, 6);
    assert!((state.total_distance_meters - 10_000.0).abs() < f64::EPSILON);
    assert_eq!(state.total_time_seconds, 3000);
    assert!((state.total_elevation_meters - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_manual_edit_converts_total_distance_from_km() {
    let mut state = StreakState::default();
    let form = HashMap::from([("totalDistance".to_owned(), "10".to_owned())]);

    let report = StreakEngine::manual_edit(&mut state, &form, morning(2025, 3, 1));

    assert_eq!(report.applied, vec!["totalDistance"]);
    assert!((state.total_distance_meters - 10_000.0).abs() < f64::EPSILON);
    assert!(state.manually_updated);
    assert_eq!(state.last_manual_update, Some(morning(2025, 3, 1)));
}

#[test]
fn test_manual_edit_reports_unknown_and_invalid_keys() {
    let mut state = StreakState::default();
    let form = HashMap::from([
        ("currentStreak".to_owned(), "12".to_owned()),
        ("longestStreak".to_owned(), "many".to_owned()),
        ("favouriteShoe".to_owned(), "Pegasus".to_owned()),
    ]);

    let report = StreakEngine::manual_edit(&mut state, &form, morning(2025, 3, 1));

    assert_eq!(report.applied, vec!["currentStreak"]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.ignored, vec!["favouriteShoe".to_owned()]);
    assert_eq!(state.current_streak, 12);
    assert_eq!(state.longest_streak, 12);
}

#[test]
fn test_manual_edit_can_leave_manual_mode_explicitly() {
    let mut state = StreakState::default();
    let form = HashMap::from([
        ("currentStreak".to_owned(), "3".to_owned()),
        ("manuallyUpdated".to_owned(), "false".to_owned()),
    ]);

    StreakEngine::manual_edit(&mut state, &form, morning(2025, 3, 1));

    assert!(!state.manually_updated);
}

#[test]
fn test_reset_returns_to_automatic_mode() {
    let mut state = StreakState {
        current_streak: 9,
        total_runs: 50,
        manually_updated: true,
        last_run_date: NaiveDate::from_ymd_opt(2025, 3, 1),
        ..StreakState::default()
    };

    StreakEngine::reset(&mut state);

    assert_eq!(state, StreakState::default());
}

#[test]
fn test_non_run_watermark_does_not_block_run_same_day() {
    let mut state = StreakState::default();
    let mut watermark = Some(LastProcessedActivity::from_activity(&activity(
        1, "Walk", 2025, 3, 1, 2.0,
    )));

    let outcome = ingest(&mut state, &mut watermark, &run(2, 2025, 3, 1, 5.0));

    assert_eq!(outcome, RunOutcome::Applied);
    assert_eq!(state.current_streak, 1);
}

#[test]
fn test_run_after_other_qualifying_type_same_day_is_already_processed() {
    let rule = QualifyingRule {
        activity_types: vec!["Run".to_owned(), "TrailRun".to_owned()],
        min_distance_meters: 0.0,
    };
    let mut state = StreakState::default();
    let trail = activity(1, "TrailRun", 2025, 3, 1, 12.0);
    StreakEngine::apply_run(&mut state, &trail, None, &rule, false);
    let watermark = LastProcessedActivity::from_activity(&trail);

    let second = run(2, 2025, 3, 1, 5.0);
    let outcome = StreakEngine::apply_run(&mut state, &second, Some(&watermark), &rule, false);

    assert_eq!(outcome, RunOutcome::AlreadyProcessed);
    assert_eq!(state.total_runs, 1);
}
