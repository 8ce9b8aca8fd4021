// ABOUTME: Operator edits and resets of the streak record under the ingestion lock
// ABOUTME: Manual field overrides, streak reset, monthly and yearly rollup resets, and status snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::ingestor::ActivityIngestor;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use serde::Serialize;
use std::collections::HashMap;
use streak_core::{
    LastProcessedActivity, ManualEditReport, StatsEngine, StreakEngine, StreakRecord,
};

/// Record after an edit together with what the form changed
#[derive(Debug, Clone, Serialize)]
pub struct EditResult {
    /// Per-key result of the form
    pub report: ManualEditReport,
    /// Persisted record
    pub record: StreakRecord,
}

/// Current persisted state for status views
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    /// Streak and stats
    pub record: StreakRecord,
    /// Last ingested activity
    pub last_processed: Option<LastProcessedActivity>,
}

impl ActivityIngestor {
    /// Read the record and watermark
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn snapshot(&self) -> AppResult<StateSnapshot> {
        let _guard = self.lock_state().await;
        let record = self.repository.load_record().await?;
        Ok(StateSnapshot {
            last_processed: record.last_processed.clone(),
            record,
        })
    }

    /// Apply an operator form to the streak state
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no key could be applied, or a store error
    pub async fn edit_streak(&self, form: &HashMap<String, String>) -> AppResult<EditResult> {
        let _guard = self.lock_state().await;
        let mut record = self.repository.load_record().await?;
        let report = StreakEngine::manual_edit(&mut record.streak, form, self.clock.now());
        self.finish_edit("streak", report, record).await
    }

    /// Apply an operator form to the monthly and yearly rollups
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no key could be applied, or a store error
    pub async fn edit_stats(&self, form: &HashMap<String, String>) -> AppResult<EditResult> {
        let _guard = self.lock_state().await;
        let mut record = self.repository.load_record().await?;
        let report = StatsEngine::manual_edit(&mut record.stats, form, self.clock.now());
        self.finish_edit("stats", report, record).await
    }

    /// Zero the streak and leave manual mode
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn reset_streak(&self) -> AppResult<StreakRecord> {
        self.reset("streak", |record, _| StreakEngine::reset(&mut record.streak))
            .await
    }

    /// Zero the monthly rollup
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn reset_monthly(&self) -> AppResult<StreakRecord> {
        self.reset("stats.monthly", |record, now| {
            StatsEngine::reset_monthly(&mut record.stats, now);
        })
        .await
    }

    /// Zero the yearly rollup
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn reset_yearly(&self) -> AppResult<StreakRecord> {
        self.reset("stats.yearly", |record, now| {
            StatsEngine::reset_yearly(&mut record.stats, now);
        })
        .await
    }

    async fn reset<F>(&self, target: &str, apply: F) -> AppResult<StreakRecord>
    where
        F: FnOnce(&mut StreakRecord, chrono::DateTime<chrono::Utc>) + Send,
    {
        let _guard = self.lock_state().await;
        let mut record = self.repository.load_record().await?;
        apply(&mut record, self.clock.now());
        self.repository.save_record(&record).await?;
        AppLogger::log_manual_edit(target, &["reset"], 0, 0);
        Ok(record)
    }

    async fn finish_edit(
        &self,
        target: &str,
        report: ManualEditReport,
        record: StreakRecord,
    ) -> AppResult<EditResult> {
        if report.applied.is_empty() {
            let rejected: Vec<String> = report
                .rejected
                .iter()
                .map(|(key, err)| format!("{key}: {err}"))
                .collect();
            let message = if rejected.is_empty() {
                "form contains no recognized fields".to_owned()
            } else {
                rejected.join("; ")
            };
            return Err(AppError::invalid_input(message));
        }

        self.repository.save_record(&record).await?;
        AppLogger::log_manual_edit(
            target,
            &report.applied,
            report.rejected.len(),
            report.ignored.len(),
        );
        Ok(EditResult { report, record })
    }
}
