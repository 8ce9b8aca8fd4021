// ABOUTME: Shared server resources assembled once at startup and handed to every route
// ABOUTME: Config, state repository, token manager, Strava clients, ingestor, and webhook secrets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources
//!
//! Built once by the server binary and shared behind an `Arc`. Fields are
//! public so tests can assemble resources around fakes.

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::ingest::ActivityIngestor;
use crate::oauth2_client::{OAuth2Client, OAuth2Config, OAuth2Token, TokenEndpoint, TokenManager};
use crate::providers::{FitnessApi, StravaClient, WebhookSubscriptions};
use crate::store::{SharedStore, StateRepository};
use crate::webhook::{generate_secret, WebhookConfig, WebhookSignatureValidator};
use crate::constants::timeouts::OAUTH_STATE_TTL_SECS;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use streak_core::Clock;
use tracing::warn;

/// Centralized resource container for route handlers
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Typed state access
    pub repository: StateRepository,
    /// Stored-token lifecycle
    pub token_manager: Arc<TokenManager>,
    /// Authorization code flow; absent without client credentials
    pub oauth_client: Option<Arc<OAuth2Client>>,
    /// Push subscription management; absent without client credentials
    pub subscriptions: Option<Arc<WebhookSubscriptions>>,
    /// Ingestion pipeline and state lock
    pub ingestor: Arc<ActivityIngestor>,
    /// Resolved webhook secrets
    pub webhook_config: WebhookConfig,
    /// Validator built from the signing secret
    pub webhook_validator: WebhookSignatureValidator,
    /// Outstanding OAuth `state` values and when they were issued
    pub oauth_states: DashMap<String, DateTime<Utc>>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl ServerResources {
    /// Wire the production resources from configuration and a connected store
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook configuration cannot be resolved
    pub async fn build(
        config: ServerConfig,
        store: SharedStore,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let repository = StateRepository::new(
            store,
            config.streak.monthly_goal_meters,
            config.streak.yearly_goal_meters,
        );

        let oauth_config = if config.strava.has_credentials() {
            Some(OAuth2Config::from_strava(&config.strava)?)
        } else {
            warn!("Strava credentials missing; OAuth, API calls and subscriptions are disabled");
            None
        };
        let oauth_client = oauth_config.clone().map(|c| Arc::new(OAuth2Client::new(c)));
        let subscriptions = oauth_config
            .as_ref()
            .map(|c| Arc::new(WebhookSubscriptions::new(&config.strava.base_url, c)));

        let endpoint: Arc<dyn TokenEndpoint> = match &oauth_client {
            Some(client) => client.clone(),
            None => Arc::new(MissingCredentials),
        };
        let token_manager = Arc::new(TokenManager::new(
            repository.clone(),
            endpoint,
            clock.clone(),
        ));

        let fitness_api: Arc<dyn FitnessApi> = Arc::new(StravaClient::new(
            &config.strava.base_url,
            token_manager.clone(),
        ));
        let ingestor = Arc::new(ActivityIngestor::new(
            fitness_api,
            repository.clone(),
            config.streak.qualifying_rule.clone(),
            clock.clone(),
            config.streak.update_descriptions,
        ));

        let webhook_config = WebhookConfig::resolve(&repository, &config.webhook, clock.now()).await?;

        Ok(Self {
            config: Arc::new(config),
            repository,
            token_manager,
            oauth_client,
            subscriptions,
            ingestor,
            webhook_validator: WebhookSignatureValidator::new(webhook_config.signing_secret.clone()),
            webhook_config,
            oauth_states: DashMap::new(),
            clock,
        })
    }

    /// Issue a fresh OAuth `state` value
    pub fn issue_oauth_state(&self) -> String {
        let now = self.clock.now();
        let ttl = Duration::seconds(OAUTH_STATE_TTL_SECS);
        self.oauth_states.retain(|_, issued| now - *issued < ttl);

        let state = generate_secret();
        self.oauth_states.insert(state.clone(), now);
        state
    }

    /// Consume an OAuth `state` value; true when it was issued and has not expired
    pub fn take_oauth_state(&self, state: &str) -> bool {
        let ttl = Duration::seconds(OAUTH_STATE_TTL_SECS);
        self.oauth_states
            .remove(state)
            .is_some_and(|(_, issued)| self.clock.now() - issued < ttl)
    }

    /// Subscription client, or a configuration error
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when Strava credentials are missing
    pub fn subscriptions(&self) -> AppResult<&WebhookSubscriptions> {
        self.subscriptions
            .as_deref()
            .ok_or_else(|| AppError::config("STRAVA_CLIENT_ID and STRAVA_CLIENT_SECRET are required"))
    }
}

/// Token endpoint used when no client credentials are configured
struct MissingCredentials;

#[async_trait::async_trait]
impl TokenEndpoint for MissingCredentials {
    async fn refresh(&self, _refresh_token: &str) -> AppResult<OAuth2Token> {
        Err(AppError::config(
            "STRAVA_CLIENT_ID and STRAVA_CLIENT_SECRET are required to refresh tokens",
        ))
    }
}
