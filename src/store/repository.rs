// ABOUTME: Typed access to the persisted records kept in the state store
// ABOUTME: Streak record with its dedup watermark, OAuth tokens, and webhook config as JSON documents
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::SharedStore;
use crate::constants::store_keys;
use crate::errors::AppResult;
use crate::oauth2_client::OAuth2Token;
use crate::webhook::WebhookConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use streak_core::{LastProcessedActivity, StatsState, StreakRecord};
use tracing::warn;

/// Typed wrapper over the state store
///
/// A record that fails to parse is logged and treated as absent, so a
/// corrupted value never blocks ingestion.
#[derive(Clone)]
pub struct StateRepository {
    store: SharedStore,
    monthly_goal_meters: f64,
    yearly_goal_meters: f64,
}

impl StateRepository {
    /// Create a repository; goals seed a record that does not exist yet
    #[must_use]
    pub fn new(store: SharedStore, monthly_goal_meters: f64, yearly_goal_meters: f64) -> Self {
        Self {
            store,
            monthly_goal_meters,
            yearly_goal_meters,
        }
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// A fresh record carrying the configured goals
    #[must_use]
    pub fn default_record(&self) -> StreakRecord {
        StreakRecord {
            streak: streak_core::StreakState::default(),
            stats: StatsState::with_goals(self.monthly_goal_meters, self.yearly_goal_meters),
            last_processed: None,
        }
    }

    /// Load the streak record, or a fresh one
    ///
    /// A record without a watermark picks up one stored under the older
    /// standalone key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn load_record(&self) -> AppResult<StreakRecord> {
        let mut record: StreakRecord = self
            .load(store_keys::STREAK_RECORD)
            .await?
            .unwrap_or_else(|| self.default_record());
        if record.last_processed.is_none() {
            record.last_processed = self.load(store_keys::LEGACY_LAST_PROCESSED_ACTIVITY).await?;
        }
        Ok(record)
    }

    /// Persist streak, stats, and watermark in one write
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails
    pub async fn save_record(&self, record: &StreakRecord) -> AppResult<()> {
        self.save(store_keys::STREAK_RECORD, record).await
    }

    /// Load the dedup watermark
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn load_watermark(&self) -> AppResult<Option<LastProcessedActivity>> {
        Ok(self.load_record().await?.last_processed)
    }

    /// Load OAuth tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn load_tokens(&self) -> AppResult<Option<OAuth2Token>> {
        self.load(store_keys::STRAVA_TOKENS).await
    }

    /// Persist OAuth tokens
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails
    pub async fn save_tokens(&self, tokens: &OAuth2Token) -> AppResult<()> {
        self.save(store_keys::STRAVA_TOKENS, tokens).await
    }

    /// Load webhook secrets
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn load_webhook_config(&self) -> AppResult<Option<WebhookConfig>> {
        self.load(store_keys::WEBHOOK_CONFIG).await
    }

    /// Persist webhook secrets
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails
    pub async fn save_webhook_config(&self, config: &WebhookConfig) -> AppResult<()> {
        self.save(store_keys::WEBHOOK_CONFIG, config).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored record is corrupt; treating as absent");
                Ok(None)
            }
        }
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }
}
