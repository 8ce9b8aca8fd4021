// ABOUTME: Fitness API abstraction consumed by ingestion and the poller
// ABOUTME: Strava implementation plus push-subscription management
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Fitness API providers
//!
//! The ingestor only depends on [`FitnessApi`]; tests substitute an
//! in-memory implementation.

/// Strava REST client
pub mod strava;
/// Strava push subscription management
pub mod subscriptions;

use crate::errors::AppResult;
use streak_core::Activity;

pub use strava::StravaClient;
pub use subscriptions::{PushSubscription, WebhookSubscriptions};

/// Operations the streak service needs from a fitness API
#[async_trait::async_trait]
pub trait FitnessApi: Send + Sync {
    /// Fetch one activity with its current description
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the activity does not exist
    async fn get_activity(&self, id: u64) -> AppResult<Activity>;

    /// Activities that started after `after_unix_ts`, in provider order
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails
    async fn list_activities_after(&self, after_unix_ts: i64) -> AppResult<Vec<Activity>>;

    /// Replace the description of an activity
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected
    async fn update_activity_description(&self, id: u64, description: &str) -> AppResult<()>;
}
