// ABOUTME: Webhook subscription commands for streak-cli
// ABOUTME: Create, list, and delete Strava push subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use run_streak::{errors::AppResult, resources::ServerResources};
use tracing::info;

type Result<T> = AppResult<T>;

/// Register the callback; Strava calls `GET /webhook` on a running server before answering
pub async fn create(resources: &ServerResources, callback_url: Option<String>) -> Result<()> {
    let callback_url = callback_url.unwrap_or_else(|| resources.config.webhook_callback_url());
    info!("Registering webhook callback {callback_url}");
    let id = resources
        .subscriptions()?
        .create(&callback_url, &resources.webhook_config.verify_token)
        .await?;
    println!("Created subscription {id} for {callback_url}");
    Ok(())
}

/// List subscriptions
pub async fn list(resources: &ServerResources) -> Result<()> {
    let subscriptions = resources.subscriptions()?.list().await?;
    if subscriptions.is_empty() {
        println!("No push subscriptions registered.");
        return Ok(());
    }
    for subscription in subscriptions {
        println!(
            "{}  {}  created {}",
            subscription.id,
            subscription.callback_url.as_deref().unwrap_or("-"),
            subscription.created_at.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Delete a subscription
pub async fn delete(resources: &ServerResources, id: u64) -> Result<()> {
    resources.subscriptions()?.delete(id).await?;
    println!("Deleted subscription {id}");
    Ok(())
}
