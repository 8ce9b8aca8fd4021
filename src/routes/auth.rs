// ABOUTME: Strava authorization code flow: redirect to consent and handle the callback
// ABOUTME: Issues and checks OAuth state values and stores the exchanged token set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::strava;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::resources::ServerResources;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Query parameters Strava sends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    /// Authorization code
    pub code: Option<String>,
    /// State issued by `/auth/strava`
    pub state: Option<String>,
    /// Scopes the athlete granted
    pub scope: Option<String>,
    /// Set when the athlete denied access
    pub error: Option<String>,
}

/// OAuth routes implementation
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create the OAuth routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/strava", get(Self::handle_authorize))
            .route("/auth/strava/callback", get(Self::handle_callback))
            .with_state(resources)
    }

    async fn handle_authorize(State(resources): State<Arc<ServerResources>>) -> AppResult<Redirect> {
        let client = resources
            .oauth_client
            .as_ref()
            .ok_or_else(|| AppError::config("Strava client credentials are not configured"))?;
        let state = resources.issue_oauth_state();
        let url = client.get_authorization_url(&state)?;
        AppLogger::log_oauth_event(strava::PROVIDER, "authorize_redirect", true);
        Ok(Redirect::temporary(&url))
    }

    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<OAuthCallbackQuery>,
    ) -> AppResult<Json<Value>> {
        if let Some(error) = query.error {
            AppLogger::log_oauth_event(strava::PROVIDER, "authorize_denied", false);
            return Err(AppError::permission_denied(format!(
                "Strava authorization was not granted: {error}"
            )));
        }

        let state_ok = query
            .state
            .as_deref()
            .is_some_and(|state| resources.take_oauth_state(state));
        if !state_ok {
            AppLogger::log_security_event("oauth_state_invalid", "callback with unknown or expired state");
            return Err(AppError::auth_invalid("Invalid or expired OAuth state"));
        }

        let code = query
            .code
            .ok_or_else(|| AppError::invalid_input("Missing authorization code"))?;
        let client = resources
            .oauth_client
            .as_ref()
            .ok_or_else(|| AppError::config("Strava client credentials are not configured"))?;

        let (mut tokens, athlete) = client.exchange_code(&code).await.inspect_err(|_| {
            AppLogger::log_oauth_event(strava::PROVIDER, "code_exchange", false);
        })?;
        if tokens.scope.is_none() {
            tokens.scope.clone_from(&query.scope);
        }
        if resources.config.streak.update_descriptions
            && !tokens
                .scope
                .as_deref()
                .is_some_and(|scope| scope.contains("activity:write"))
        {
            warn!("Granted scope lacks activity:write; description updates will fail");
        }

        resources.token_manager.store_tokens(&tokens).await?;
        AppLogger::log_oauth_event(strava::PROVIDER, "code_exchange", true);
        info!(athlete_id = ?tokens.athlete_id, "Strava account connected");

        Ok(Json(json!({
            "connected": true,
            "athlete": athlete,
            "scope": tokens.scope,
            "expires_at": tokens.expires_at.map(|t| t.to_rfc3339()),
        })))
    }
}
