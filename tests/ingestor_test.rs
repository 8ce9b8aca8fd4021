// ABOUTME: Integration tests for the activity ingestion pipeline and the poller
// ABOUTME: Covers each outcome, push failures, lookback continuation, and poll ordering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{activity, ingestor, init_test_logging, memory_repository, morning, run, FakeFitnessApi};
use run_streak::ingest::{IngestOutcome, IngestStage, Poller};
use run_streak::store::StateStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_first_run_is_processed_and_pushed() -> Result<()> {
    init_test_logging();
    let api = Arc::new(FakeFitnessApi::with_activities([run(1, 2025, 3, 10, 5.0)]));
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), true);

    let outcome = ingestor.ingest_by_id(1, "test").await?;

    let IngestOutcome::Processed {
        current_streak,
        description,
    } = outcome
    else {
        panic!("expected a processed outcome, got {outcome:?}");
    };
    assert_eq!(current_streak, 1);
    assert!(description.contains("Streak: Day 1"));

    let pushed = api.pushed();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0], (1, description));

    let record = repo.load_record().await?;
    assert_eq!(record.streak.total_runs, 1);
    assert!((record.stats.monthly_distance_meters - 5000.0).abs() < f64::EPSILON);
    assert_eq!(repo.load_watermark().await?.map(|w| w.id), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_same_activity_twice_is_skipped() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([run(1, 2025, 3, 10, 5.0)]));
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), true);

    ingestor.ingest_by_id(1, "webhook").await?;
    let before = repo.load_record().await?;
    let outcome = ingestor.ingest_by_id(1, "poll").await?;

    assert_eq!(outcome, IngestOutcome::Skipped);
    assert_eq!(repo.load_record().await?, before);
    assert_eq!(api.pushed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_non_run_only_moves_watermark() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([
        activity(1, "Walk", 2025, 3, 10, 3.0),
        run(2, 2025, 3, 10, 5.0),
    ]));
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), true);

    let outcome = ingestor.ingest_by_id(1, "test").await?;

    assert_eq!(outcome, IngestOutcome::RecordedNonRun);
    assert_eq!(repo.load_record().await?.streak.total_runs, 0);
    assert_eq!(repo.load_watermark().await?.map(|w| w.id), Some(1));
    assert!(api.pushed().is_empty());

    // A walk earlier the same day does not block the run
    let outcome = ingestor.ingest_by_id(2, "test").await?;
    assert!(matches!(outcome, IngestOutcome::Processed { current_streak: 1, .. }));
    Ok(())
}

#[tokio::test]
async fn test_second_run_same_day_is_already_counted() -> Result<()> {
    let mut evening = run(2, 2025, 3, 10, 3.0);
    evening.start_date += Duration::hours(10);
    evening.start_date_local = Some(evening.start_date);
    let api = Arc::new(FakeFitnessApi::with_activities([
        run(1, 2025, 3, 10, 5.0),
        evening,
    ]));
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), true);

    ingestor.ingest_by_id(1, "test").await?;
    let outcome = ingestor.ingest_by_id(2, "test").await?;

    assert_eq!(outcome, IngestOutcome::AlreadyCounted);
    let record = repo.load_record().await?;
    assert_eq!(record.streak.total_runs, 1);
    assert!((record.streak.total_distance_meters - 5000.0).abs() < f64::EPSILON);
    assert_eq!(api.pushed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_push_keeps_state_and_retry_is_skipped() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([run(1, 2025, 3, 10, 5.0)]));
    api.fail_updates.store(true, Ordering::SeqCst);
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), true);

    let err = ingestor.ingest_by_id(1, "webhook").await.unwrap_err();

    assert_eq!(err.activity_id, 1);
    assert_eq!(err.stage, IngestStage::UpdateDescription);
    assert!(err.to_string().contains("update_description"));
    assert_eq!(repo.load_record().await?.streak.current_streak, 1);

    api.fail_updates.store(false, Ordering::SeqCst);
    let outcome = ingestor.ingest_by_id(1, "webhook").await?;
    assert_eq!(outcome, IngestOutcome::Skipped);
    assert_eq!(repo.load_record().await?.streak.total_runs, 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_activity_fails_at_fetch() {
    let api = Arc::new(FakeFitnessApi::new());
    let ingestor = ingestor(api, memory_repository(), morning(2025, 3, 10), true);

    let err = ingestor.ingest_by_id(404, "webhook").await.unwrap_err();

    assert_eq!(err.stage, IngestStage::FetchActivity);
    assert_eq!(err.source.http_status(), 404);
}

#[tokio::test]
async fn test_descriptions_disabled_skips_push() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([run(1, 2025, 3, 10, 5.0)]));
    let repo = memory_repository();
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 10), false);

    let outcome = ingestor.ingest_by_id(1, "test").await?;

    assert!(matches!(outcome, IngestOutcome::Processed { .. }));
    assert!(api.pushed().is_empty());
    assert_eq!(repo.load_record().await?.streak.current_streak, 1);
    Ok(())
}

#[tokio::test]
async fn test_lookback_finds_missed_run_yesterday() -> Result<()> {
    let repo = memory_repository();
    let mut record = repo.default_record();
    record.streak.current_streak = 3;
    record.streak.longest_streak = 3;
    record.streak.last_run_date = NaiveDate::from_ymd_opt(2025, 3, 2);
    repo.save_record(&record).await?;

    // Run 7 was never delivered; run 8 arrives two days after the last counted run
    let api = Arc::new(FakeFitnessApi::with_activities([
        run(7, 2025, 3, 3, 5.0),
        run(8, 2025, 3, 4, 5.0),
    ]));
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 4), false);

    let outcome = ingestor.ingest_by_id(8, "webhook").await?;

    assert!(matches!(outcome, IngestOutcome::Processed { current_streak: 4, .. }));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_gap_without_lookback_run_resets() -> Result<()> {
    let repo = memory_repository();
    let mut record = repo.default_record();
    record.streak.current_streak = 3;
    record.streak.longest_streak = 3;
    record.streak.last_run_date = NaiveDate::from_ymd_opt(2025, 3, 1);
    repo.save_record(&record).await?;

    let api = Arc::new(FakeFitnessApi::with_activities([run(8, 2025, 3, 4, 5.0)]));
    let ingestor = ingestor(api.clone(), repo.clone(), morning(2025, 3, 4), false);

    let outcome = ingestor.ingest_by_id(8, "webhook").await?;

    assert!(matches!(outcome, IngestOutcome::Processed { current_streak: 1, .. }));
    let saved = repo.load_record().await?;
    assert_eq!(saved.streak.longest_streak, 3);
    assert_eq!(saved.streak.streak_start_date, NaiveDate::from_ymd_opt(2025, 3, 4));
    Ok(())
}

#[tokio::test]
async fn test_consecutive_run_does_not_query_lookback() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([
        run(1, 2025, 3, 10, 5.0),
        run(2, 2025, 3, 11, 5.0),
    ]));
    let ingestor = ingestor(api.clone(), memory_repository(), morning(2025, 3, 11), false);

    ingestor.ingest_by_id(1, "test").await?;
    ingestor.ingest_by_id(2, "test").await?;

    assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_poll_ingests_oldest_first() -> Result<()> {
    init_test_logging();
    let api = Arc::new(FakeFitnessApi::with_activities([
        run(1, 2025, 3, 1, 5.0),
        run(2, 2025, 3, 2, 6.0),
        activity(3, "Ride", 2025, 3, 2, 30.0),
        run(4, 2025, 3, 3, 7.0),
    ]));
    let repo = memory_repository();
    let ingestor = Arc::new(ingestor(api.clone(), repo.clone(), morning(2025, 3, 3), true));
    let poller = Poller::new(ingestor, 96);

    let summary = poller.poll_once().await?;

    assert_eq!(summary.listed, 4);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 0);

    let record = repo.load_record().await?;
    assert_eq!(record.streak.current_streak, 3);
    assert_eq!(repo.load_watermark().await?.map(|w| w.id), Some(4));

    let pushed_ids: Vec<u64> = api.pushed().into_iter().map(|(id, _)| id).collect();
    assert_eq!(pushed_ids, vec![1, 2, 4]);

    let again = poller.poll_once().await?;
    assert_eq!(again.listed, 0);
    Ok(())
}

#[tokio::test]
async fn test_poll_counts_failures_and_continues() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([
        run(1, 2025, 3, 1, 5.0),
        run(2, 2025, 3, 2, 6.0),
    ]));
    api.fail_updates.store(true, Ordering::SeqCst);
    let repo = memory_repository();
    let ingestor = Arc::new(ingestor(api.clone(), repo.clone(), morning(2025, 3, 2), true));

    let summary = Poller::new(ingestor, 96).poll_once().await?;

    assert_eq!(summary.failed, 2);
    assert_eq!(repo.load_record().await?.streak.current_streak, 2);
    Ok(())
}

#[tokio::test]
async fn test_poll_listing_failure_is_an_error() {
    let api = Arc::new(FakeFitnessApi::new());
    api.fail_listing.store(true, Ordering::SeqCst);
    let ingestor = Arc::new(ingestor(api, memory_repository(), morning(2025, 3, 2), true));

    assert!(Poller::new(ingestor, 48).poll_once().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestions_never_lose_an_increment() -> Result<()> {
    const RUNS: u32 = 12;
    let api = Arc::new(FakeFitnessApi::with_activities(
        (1..=RUNS).map(|day| run(u64::from(day), 2025, 3, day, 5.0)),
    ));
    let repo = memory_repository();
    let ingestor = Arc::new(ingestor(api.clone(), repo.clone(), morning(2025, 3, 20), false));

    let handles: Vec<_> = (1..=RUNS)
        .map(|day| {
            let ingestor = ingestor.clone();
            tokio::spawn(async move { ingestor.ingest_by_id(u64::from(day), "webhook").await })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    let record = repo.load_record().await?;
    assert_eq!(record.streak.total_runs, RUNS);
    assert!((record.streak.total_distance_meters - f64::from(RUNS) * 5000.0).abs() < 1e-6);
    assert!((record.stats.monthly_distance_meters - f64::from(RUNS) * 5000.0).abs() < 1e-6);
    assert_eq!(record.last_processed.map(|w| w.id), Some(u64::from(RUNS)));
    Ok(())
}

#[tokio::test]
async fn test_month_rollover_through_ingestion_uses_local_calendar() -> Result<()> {
    let repo = memory_repository();

    let february = run(1, 2025, 2, 27, 8.0);
    let api = Arc::new(FakeFitnessApi::with_activities([february.clone()]));
    ingestor(api, repo.clone(), morning(2025, 2, 27), false)
        .ingest_activity(&february)
        .await?;

    // 07:00 on Mar 1 in UTC+10, delivered while it is still Feb 28 in UTC
    let mut first_of_march = run(2, 2025, 3, 1, 10.0);
    first_of_march.start_date_local = Some(Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap());
    first_of_march.start_date = Utc.with_ymd_and_hms(2025, 2, 28, 21, 0, 0).unwrap();
    let api = Arc::new(FakeFitnessApi::with_activities([first_of_march.clone()]));
    let delivered_at = Utc.with_ymd_and_hms(2025, 2, 28, 21, 10, 0).unwrap();
    ingestor(api, repo.clone(), delivered_at, false)
        .ingest_activity(&first_of_march)
        .await?;

    let record = repo.load_record().await?;
    assert!((record.stats.monthly_distance_meters - 10_000.0).abs() < f64::EPSILON);
    assert!((record.stats.yearly_distance_meters - 18_000.0).abs() < f64::EPSILON);

    let mut second_of_march = run(3, 2025, 3, 2, 6.0);
    second_of_march.start_date_local = Some(Utc.with_ymd_and_hms(2025, 3, 2, 7, 0, 0).unwrap());
    second_of_march.start_date = Utc.with_ymd_and_hms(2025, 3, 1, 21, 0, 0).unwrap();
    let api = Arc::new(FakeFitnessApi::with_activities([second_of_march.clone()]));
    let delivered_at = Utc.with_ymd_and_hms(2025, 3, 1, 21, 10, 0).unwrap();
    ingestor(api, repo.clone(), delivered_at, false)
        .ingest_activity(&second_of_march)
        .await?;

    let record = repo.load_record().await?;
    assert!((record.stats.monthly_distance_meters - 16_000.0).abs() < f64::EPSILON);
    assert!((record.stats.yearly_distance_meters - 24_000.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_watermark_is_written_with_the_record() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([run(7, 2025, 3, 10, 5.0)]));
    let repo = memory_repository();
    let ingestor = ingestor(api, repo.clone(), morning(2025, 3, 10), false);

    ingestor.ingest_by_id(7, "test").await?;

    let raw = repo
        .store()
        .get(run_streak::constants::store_keys::STREAK_RECORD)
        .await?
        .unwrap();
    let stored: streak_core::StreakRecord = serde_json::from_str(&raw)?;
    assert_eq!(stored.streak.total_runs, 1);
    assert_eq!(stored.last_processed.map(|w| w.id), Some(7));
    Ok(())
}
