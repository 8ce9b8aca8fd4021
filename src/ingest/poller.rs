// ABOUTME: Background poller that lists recent activities and ingests any the webhook missed
// ABOUTME: Searches after the watermark, or a lookback window when there is none, oldest first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::ingestor::{ActivityIngestor, IngestOutcome};
use crate::errors::AppResult;
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Counts from one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    /// Activities returned by the listing
    pub listed: usize,
    /// Runs that changed the streak record
    pub processed: usize,
    /// Activities skipped, already counted, or recorded as non-runs
    pub unchanged: usize,
    /// Activities whose ingestion failed
    pub failed: usize,
}

/// Interval poller over the fitness API
pub struct Poller {
    ingestor: Arc<ActivityIngestor>,
    lookback_hours: u64,
}

impl Poller {
    /// Create a poller
    #[must_use]
    pub const fn new(ingestor: Arc<ActivityIngestor>, lookback_hours: u64) -> Self {
        Self {
            ingestor,
            lookback_hours,
        }
    }

    /// List and ingest everything newer than the watermark
    ///
    /// Individual failures are logged and counted; the poll continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the watermark cannot be read or the listing fails
    pub async fn poll_once(&self) -> AppResult<PollSummary> {
        let after = match self.ingestor.repository().load_watermark().await? {
            Some(mark) => mark.date.timestamp(),
            None => {
                let hours = i64::try_from(self.lookback_hours).unwrap_or(i64::MAX / 3600);
                (self.ingestor.clock.now() - ChronoDuration::hours(hours)).timestamp()
            }
        };

        let mut activities = self.ingestor.api().list_activities_after(after).await?;
        activities.sort_by_key(|activity| activity.start_date);

        let mut summary = PollSummary {
            listed: activities.len(),
            ..PollSummary::default()
        };

        for activity in &activities {
            match self.ingestor.ingest_by_id(activity.id, "poll").await {
                Ok(IngestOutcome::Processed { .. }) => summary.processed += 1,
                Ok(_) => summary.unchanged += 1,
                Err(e) => {
                    warn!(activity_id = activity.id, stage = %e.stage, "Poll ingestion failed, continuing");
                    summary.failed += 1;
                }
            }
        }

        debug!(?summary, "Poll finished");
        Ok(summary)
    }

    /// Poll every `period` until `shutdown` flips to true
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = period.as_secs(), "Activity poller started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "Activity poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Activity poller stopped");
    }
}
