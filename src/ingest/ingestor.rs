// ABOUTME: Orchestrates one activity through dedup, engines, persistence, and description push
// ABOUTME: Holds the process-wide state lock and reports failures with activity ID and stage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Ingestion
//!
//! For one activity:
//!
//! 1. Fetch it from the fitness API (outside the lock).
//! 2. Under the state lock, load the record and watermark.
//! 3. Same ID as the watermark: `Skipped`.
//! 4. Not a qualifying run: advance the watermark, `RecordedNonRun`.
//! 5. Run already counted for the day: `AlreadyCounted`, nothing written.
//! 6. Otherwise apply the streak and stats engines, persist the record with
//!    the advanced watermark in a single write, then render and push the
//!    description.
//!
//! The watermark lives inside the streak record, so counters and watermark
//! are persisted together or not at all. State is persisted before the push
//! so a failed push never leads to a second count when the activity is retried.

use crate::errors::AppError;
use crate::logging::AppLogger;
use crate::providers::FitnessApi;
use crate::store::StateRepository;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use streak_core::dates::days_between;
use streak_core::{
    Activity, Clock, DescriptionFormatter, LastProcessedActivity, QualifyingRule, RunOutcome,
    StatsEngine, StreakEngine, StreakRecord,
};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Terminal state of one ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Same activity as the watermark
    Skipped,
    /// Not a qualifying run; only the watermark moved
    RecordedNonRun,
    /// A run was already counted for that day
    AlreadyCounted,
    /// State updated and description rendered
    Processed {
        /// Streak after the update
        current_streak: u32,
        /// Rendered description
        description: String,
    },
}

impl IngestOutcome {
    /// Short label for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::RecordedNonRun => "recorded_non_run",
            Self::AlreadyCounted => "already_counted",
            Self::Processed { .. } => "processed",
        }
    }
}

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestStage {
    /// Reading the activity from the fitness API
    FetchActivity,
    /// Reading state from the store
    LoadState,
    /// Writing state to the store
    PersistState,
    /// Pushing the rendered description
    UpdateDescription,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchActivity => "fetch_activity",
            Self::LoadState => "load_state",
            Self::PersistState => "persist_state",
            Self::UpdateDescription => "update_description",
        };
        f.write_str(name)
    }
}

/// Ingestion failure with enough context to diagnose it
#[derive(Debug, Error)]
#[error("activity {activity_id} failed at {stage}: {source}")]
pub struct IngestError {
    /// Activity being ingested
    pub activity_id: u64,
    /// Stage that failed
    pub stage: IngestStage,
    /// Underlying error
    #[source]
    pub source: AppError,
}

impl IngestError {
    fn at(activity_id: u64, stage: IngestStage) -> impl FnOnce(AppError) -> Self {
        move |source| Self {
            activity_id,
            stage,
            source,
        }
    }
}

impl From<IngestError> for AppError {
    fn from(error: IngestError) -> Self {
        let message = error.to_string();
        let converted = Self::new(error.source.code, message);
        match error.source.upstream_status {
            Some(status) => converted.with_upstream_status(status),
            None => converted,
        }
    }
}

/// Activity ingestion pipeline
///
/// The state lock is per process; every read-modify-write of the streak
/// record goes through it, including operator edits.
pub struct ActivityIngestor {
    pub(super) api: Arc<dyn FitnessApi>,
    pub(super) repository: StateRepository,
    pub(super) rule: QualifyingRule,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) update_descriptions: bool,
    state_lock: Mutex<()>,
}

impl ActivityIngestor {
    /// Create an ingestor
    pub fn new(
        api: Arc<dyn FitnessApi>,
        repository: StateRepository,
        rule: QualifyingRule,
        clock: Arc<dyn Clock>,
        update_descriptions: bool,
    ) -> Self {
        Self {
            api,
            repository,
            rule,
            clock,
            update_descriptions,
            state_lock: Mutex::new(()),
        }
    }

    /// Repository used for state
    #[must_use]
    pub const fn repository(&self) -> &StateRepository {
        &self.repository
    }

    /// Fitness API used for reads and pushes
    #[must_use]
    pub fn api(&self) -> &Arc<dyn FitnessApi> {
        &self.api
    }

    pub(super) async fn lock_state(&self) -> MutexGuard<'_, ()> {
        self.state_lock.lock().await
    }

    /// Fetch and ingest one activity
    ///
    /// # Errors
    ///
    /// Returns an `IngestError` naming the failed stage
    pub async fn ingest_by_id(
        &self,
        activity_id: u64,
        source: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        let result = match self.api.get_activity(activity_id).await {
            Ok(activity) => self.ingest_activity(&activity).await,
            Err(e) => Err(IngestError::at(activity_id, IngestStage::FetchActivity)(e)),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(outcome) => {
                AppLogger::log_ingestion(activity_id, source, outcome.label(), elapsed_ms);
            }
            Err(e) => AppLogger::log_ingestion_failure(
                activity_id,
                source,
                &e.stage.to_string(),
                &e.source.to_string(),
            ),
        }
        result
    }

    /// Ingest an already fetched activity
    ///
    /// # Errors
    ///
    /// Returns an `IngestError` naming the failed stage
    pub async fn ingest_activity(&self, activity: &Activity) -> Result<IngestOutcome, IngestError> {
        let id = activity.id;
        let _guard = self.lock_state().await;

        let mut record = self
            .repository
            .load_record()
            .await
            .map_err(IngestError::at(id, IngestStage::LoadState))?;
        let watermark = record.last_processed.clone();

        if watermark.as_ref().is_some_and(|mark| mark.id == id) {
            debug!(activity_id = id, "Activity matches watermark, skipping");
            return Ok(IngestOutcome::Skipped);
        }

        if !self.rule.qualifies(activity) {
            if Self::advance_watermark(&mut record, activity) {
                self.repository
                    .save_record(&record)
                    .await
                    .map_err(IngestError::at(id, IngestStage::PersistState))?;
            }
            return Ok(IngestOutcome::RecordedNonRun);
        }

        if StreakEngine::is_duplicate(activity, watermark.as_ref(), &self.rule) {
            return Ok(IngestOutcome::AlreadyCounted);
        }

        let ran_yesterday = self.ran_yesterday_if_needed(&record, activity).await;
        let now = self.clock.now();

        if StreakEngine::apply_run(
            &mut record.streak,
            activity,
            watermark.as_ref(),
            &self.rule,
            ran_yesterday,
        ) == RunOutcome::AlreadyProcessed
        {
            return Ok(IngestOutcome::AlreadyCounted);
        }
        StatsEngine::apply_run(&mut record.stats, activity, now);
        Self::advance_watermark(&mut record, activity);

        // Counters and watermark land in one write
        self.repository
            .save_record(&record)
            .await
            .map_err(IngestError::at(id, IngestStage::PersistState))?;

        let description = DescriptionFormatter::render(
            &record.streak,
            &record.stats,
            activity.description.as_deref(),
        );

        if self.update_descriptions {
            self.api
                .update_activity_description(id, &description)
                .await
                .map_err(IngestError::at(id, IngestStage::UpdateDescription))?;
        }

        Ok(IngestOutcome::Processed {
            current_streak: record.streak.current_streak,
            description,
        })
    }

    /// Move the watermark forward; an older activity never moves it back
    ///
    /// Returns whether the watermark changed.
    fn advance_watermark(record: &mut StreakRecord, activity: &Activity) -> bool {
        if record
            .last_processed
            .as_ref()
            .is_some_and(|mark| mark.date > activity.start_date)
        {
            debug!(activity_id = activity.id, "Older than watermark, leaving it in place");
            return false;
        }
        record.last_processed = Some(LastProcessedActivity::from_activity(activity));
        true
    }

    /// Query for a run on the day before `activity`, but only when the streak would reset
    async fn ran_yesterday_if_needed(&self, record: &StreakRecord, activity: &Activity) -> bool {
        let run_date = activity.calendar_date();
        let would_reset = !record.streak.manually_updated
            && record
                .streak
                .last_run_date
                .is_some_and(|last| days_between(last, run_date) > 1);
        if !would_reset {
            return false;
        }

        match self.qualifying_run_on(run_date - Duration::days(1), activity.id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(activity_id = activity.id, error = %e, "Lookback query failed, assuming no run yesterday");
                false
            }
        }
    }

    async fn qualifying_run_on(
        &self,
        day: NaiveDate,
        exclude_id: u64,
    ) -> crate::errors::AppResult<bool> {
        // Local dates can be up to a day ahead of or behind UTC
        let window_start = day - Duration::days(1);
        let after = window_start
            .and_hms_opt(0, 0, 0)
            .map_or(0, |dt| Utc.from_utc_datetime(&dt).timestamp());

        let candidates = self.api.list_activities_after(after).await?;
        Ok(candidates.iter().any(|candidate| {
            candidate.id != exclude_id
                && candidate.calendar_date() == day
                && self.rule.qualifies(candidate)
        }))
    }
}
