// ABOUTME: Operator API for status, manual edits, resets, on-demand processing, and subscriptions
// ABOUTME: Optional bearer key checked in constant time by a router middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Admin routes
//!
//! When `ADMIN_API_KEY` is set every `/api` request must carry
//! `Authorization: Bearer <key>`. Edits and resets go through the ingestor so
//! they serialize with ingestion.

use crate::errors::{AppError, AppResult};
use crate::ingest::{EditResult, IngestOutcome, PollSummary, Poller, StateSnapshot};
use crate::logging::AppLogger;
use crate::providers::PushSubscription;
use crate::resources::ServerResources;
use axum::extract::{Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use streak_core::StreakRecord;
use subtle::ConstantTimeEq;

/// `GET /api/status` body
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Persisted streak, stats, and watermark
    #[serde(flatten)]
    pub state: StateSnapshot,
    /// Active store backend
    pub store_backend: &'static str,
    /// Whether the durable store is reachable
    pub store_healthy: bool,
    /// Whether Strava tokens are stored
    pub strava_connected: bool,
    /// Callback URL to register with Strava
    pub webhook_callback_url: String,
    /// Whether rendered descriptions are pushed
    pub update_descriptions: bool,
    /// Poll interval in seconds; 0 when disabled
    pub poll_interval_secs: u64,
}

/// `POST /api/webhook/subscriptions` body
#[derive(Debug, Default, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Callback URL; defaults to `BASE_URL/webhook`
    pub callback_url: Option<String>,
}

/// Admin routes implementation
pub struct AdminRoutes;

impl AdminRoutes {
    /// Create all admin routes behind the API key middleware
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/status", get(Self::handle_status))
            .route("/api/streak", post(Self::handle_edit_streak))
            .route("/api/streak/reset", post(Self::handle_reset_streak))
            .route("/api/stats", post(Self::handle_edit_stats))
            .route("/api/stats/reset-monthly", post(Self::handle_reset_monthly))
            .route("/api/stats/reset-yearly", post(Self::handle_reset_yearly))
            .route("/api/activities/:id/process", post(Self::handle_process))
            .route("/api/poll", post(Self::handle_poll))
            .route(
                "/api/webhook/subscriptions",
                get(Self::handle_list_subscriptions).post(Self::handle_create_subscription),
            )
            .route(
                "/api/webhook/subscriptions/:id",
                delete(Self::handle_delete_subscription),
            )
            .route_layer(middleware::from_fn_with_state(
                resources.clone(),
                require_admin_key,
            ))
            .with_state(resources)
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<StatusResponse>> {
        let state = resources.ingestor.snapshot().await?;
        let store = resources.repository.store();
        Ok(Json(StatusResponse {
            state,
            store_backend: store.backend_name(),
            store_healthy: store.health_check().await.is_ok(),
            strava_connected: resources.token_manager.is_connected().await?,
            webhook_callback_url: resources.config.webhook_callback_url(),
            update_descriptions: resources.config.streak.update_descriptions,
            poll_interval_secs: resources.config.polling.interval_secs,
        }))
    }

    async fn handle_edit_streak(
        State(resources): State<Arc<ServerResources>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> AppResult<Json<EditResult>> {
        Ok(Json(resources.ingestor.edit_streak(&form).await?))
    }

    async fn handle_edit_stats(
        State(resources): State<Arc<ServerResources>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> AppResult<Json<EditResult>> {
        Ok(Json(resources.ingestor.edit_stats(&form).await?))
    }

    async fn handle_reset_streak(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<StreakRecord>> {
        Ok(Json(resources.ingestor.reset_streak().await?))
    }

    async fn handle_reset_monthly(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<StreakRecord>> {
        Ok(Json(resources.ingestor.reset_monthly().await?))
    }

    async fn handle_reset_yearly(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<StreakRecord>> {
        Ok(Json(resources.ingestor.reset_yearly().await?))
    }

    async fn handle_process(
        State(resources): State<Arc<ServerResources>>,
        Path(activity_id): Path<u64>,
    ) -> AppResult<Json<IngestOutcome>> {
        Ok(Json(
            resources.ingestor.ingest_by_id(activity_id, "admin").await?,
        ))
    }

    async fn handle_poll(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<PollSummary>> {
        let poller = Poller::new(
            resources.ingestor.clone(),
            resources.config.polling.lookback_hours,
        );
        Ok(Json(poller.poll_once().await?))
    }

    async fn handle_list_subscriptions(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<Vec<PushSubscription>>> {
        Ok(Json(resources.subscriptions()?.list().await?))
    }

    async fn handle_create_subscription(
        State(resources): State<Arc<ServerResources>>,
        request: Option<Json<CreateSubscriptionRequest>>,
    ) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
        let request = request.map(|Json(body)| body).unwrap_or_default();
        let callback_url = request
            .callback_url
            .unwrap_or_else(|| resources.config.webhook_callback_url());
        let id = resources
            .subscriptions()?
            .create(&callback_url, &resources.webhook_config.verify_token)
            .await?;
        Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id, "callback_url": callback_url })),
        ))
    }

    async fn handle_delete_subscription(
        State(resources): State<Arc<ServerResources>>,
        Path(subscription_id): Path<u64>,
    ) -> AppResult<StatusCode> {
        resources.subscriptions()?.delete(subscription_id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}

/// Reject requests without the configured admin key
async fn require_admin_key(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    match authorize(request.headers(), resources.config.admin.api_key.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

fn authorize(headers: &HeaderMap, expected: Option<&str>) -> AppResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(key) if bool::from(key.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        Some(_) => {
            AppLogger::log_security_event("admin_key_rejected", "bearer key mismatch");
            Err(AppError::auth_invalid("Invalid admin API key"))
        }
        None => Err(AppError::auth_invalid("Missing admin API key")),
    }
}
