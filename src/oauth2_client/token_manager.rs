// ABOUTME: Access token lifecycle on top of the state store
// ABOUTME: Proactive refresh before expiry and single-flight refresh after a 401
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::client::{OAuth2Token, TokenEndpoint};
use crate::constants::strava;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::logging::AppLogger;
use crate::store::StateRepository;
use std::sync::Arc;
use streak_core::Clock;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Supplies bearer tokens to API clients
#[async_trait::async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A token valid for at least the refresh margin
    ///
    /// # Errors
    ///
    /// Returns `ExternalAuthFailed` when no tokens are stored or refresh is rejected
    async fn access_token(&self) -> AppResult<String>;

    /// A replacement for `stale`, which the API just rejected with 401
    ///
    /// # Errors
    ///
    /// Returns `ExternalAuthFailed` when refresh is rejected
    async fn refresh_after_unauthorized(&self, stale: &str) -> AppResult<String>;
}

/// Stored-token manager
///
/// Tokens live only in the state store. Refreshes are serialized by one
/// mutex: a caller that waited on the lock re-reads the store and reuses a
/// token refreshed by the previous holder instead of refreshing again.
pub struct TokenManager {
    repository: StateRepository,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a token manager
    pub fn new(
        repository: StateRepository,
        endpoint: Arc<dyn TokenEndpoint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            endpoint,
            clock,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Store tokens from a completed authorization
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn store_tokens(&self, tokens: &OAuth2Token) -> AppResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.repository.save_tokens(tokens).await
    }

    /// Whether tokens are stored
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn is_connected(&self) -> AppResult<bool> {
        Ok(self.repository.load_tokens().await?.is_some())
    }

    async fn stored_tokens(&self) -> AppResult<OAuth2Token> {
        self.repository.load_tokens().await?.ok_or_else(|| {
            AppError::new(
                ErrorCode::ExternalAuthFailed,
                "Strava is not connected; authenticate at /auth/strava",
            )
        })
    }

    /// Refresh unless another caller already replaced `stale`
    async fn refresh_single_flight(&self, stale: &str, force: bool) -> AppResult<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.stored_tokens().await?;
        let now = self.clock.now();
        if current.access_token != stale && !current.will_expire_soon(now) {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(current.access_token);
        }
        if !force && !current.will_expire_soon(now) {
            return Ok(current.access_token);
        }

        let Some(refresh_token) = current.refresh_token.as_deref() else {
            return Err(AppError::auth_expired(strava::PROVIDER));
        };

        match self.endpoint.refresh(refresh_token).await {
            Ok(mut fresh) => {
                if fresh.athlete_id.is_none() {
                    fresh.athlete_id = current.athlete_id;
                }
                self.repository.save_tokens(&fresh).await?;
                AppLogger::log_oauth_event(strava::PROVIDER, "token_refresh", true);
                info!(expires_at = ?fresh.expires_at, "Refreshed Strava access token");
                Ok(fresh.access_token)
            }
            Err(e) => {
                AppLogger::log_oauth_event(strava::PROVIDER, "token_refresh", false);
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for TokenManager {
    async fn access_token(&self) -> AppResult<String> {
        let tokens = self.stored_tokens().await?;
        if tokens.will_expire_soon(self.clock.now()) {
            return self.refresh_single_flight(&tokens.access_token, false).await;
        }
        Ok(tokens.access_token)
    }

    async fn refresh_after_unauthorized(&self, stale: &str) -> AppResult<String> {
        self.refresh_single_flight(stale, true).await
    }
}
