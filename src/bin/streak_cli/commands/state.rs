// ABOUTME: Streak state commands for streak-cli
// ABOUTME: Status, resets, manual edits, single-activity processing, and polling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use run_streak::{
    errors::{AppError, AppResult},
    ingest::{IngestOutcome, Poller},
    resources::ServerResources,
};
use std::collections::HashMap;

use crate::helpers::display::{display_edit_report, display_record, display_watermark};

type Result<T> = AppResult<T>;

/// Print the persisted state
pub async fn status(resources: &ServerResources) -> Result<()> {
    let snapshot = resources.ingestor.snapshot().await?;
    display_record(&snapshot.record);
    display_watermark(snapshot.last_processed.as_ref());
    println!(
        "\nStrava connected: {}",
        resources.token_manager.is_connected().await?
    );
    println!("Store backend:    {}", resources.repository.store().backend_name());
    Ok(())
}

/// Zero the streak
pub async fn reset_streak(resources: &ServerResources) -> Result<()> {
    let record = resources.ingestor.reset_streak().await?;
    println!("Streak reset.");
    display_record(&record);
    Ok(())
}

/// Zero the monthly rollup
pub async fn reset_monthly(resources: &ServerResources) -> Result<()> {
    let record = resources.ingestor.reset_monthly().await?;
    println!("Monthly stats reset.");
    display_record(&record);
    Ok(())
}

/// Zero the yearly rollup
pub async fn reset_yearly(resources: &ServerResources) -> Result<()> {
    let record = resources.ingestor.reset_yearly().await?;
    println!("Yearly stats reset.");
    display_record(&record);
    Ok(())
}

/// Apply a manual streak edit
pub async fn edit_streak(
    resources: &ServerResources,
    form: &HashMap<String, String>,
) -> Result<()> {
    let result = resources.ingestor.edit_streak(form).await?;
    display_edit_report(&result.report);
    display_record(&result.record);
    Ok(())
}

/// Apply a manual stats edit
pub async fn edit_stats(
    resources: &ServerResources,
    form: &HashMap<String, String>,
) -> Result<()> {
    let result = resources.ingestor.edit_stats(form).await?;
    display_edit_report(&result.report);
    display_record(&result.record);
    Ok(())
}

/// Fetch and ingest one activity
pub async fn process(resources: &ServerResources, activity_id: u64) -> Result<()> {
    match resources.ingestor.ingest_by_id(activity_id, "cli").await? {
        IngestOutcome::Skipped => println!("Activity {activity_id} was already processed."),
        IngestOutcome::RecordedNonRun => {
            println!("Activity {activity_id} is not a qualifying run; watermark updated.");
        }
        IngestOutcome::AlreadyCounted => {
            println!("A run was already counted for that day; nothing changed.");
        }
        IngestOutcome::Processed {
            current_streak,
            description,
        } => {
            println!("Processed activity {activity_id}. Current streak: {current_streak}");
            println!("\n{description}");
        }
    }
    Ok(())
}

/// Run one poll
pub async fn poll(resources: &ServerResources) -> Result<()> {
    let poller = Poller::new(
        resources.ingestor.clone(),
        resources.config.polling.lookback_hours,
    );
    let summary = poller.poll_once().await?;
    println!(
        "Listed {}, processed {}, unchanged {}, failed {}",
        summary.listed, summary.processed, summary.unchanged, summary.failed
    );
    Ok(())
}

/// Parse `key=value` assignments into a form
pub fn parse_assignments(assignments: &[String]) -> Result<HashMap<String, String>> {
    assignments
        .iter()
        .map(|assignment| {
            assignment
                .split_once('=')
                .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| {
                    AppError::invalid_input(format!("Expected KEY=VALUE, got '{assignment}'"))
                })
        })
        .collect()
}
