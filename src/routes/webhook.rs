// ABOUTME: Strava webhook endpoints for the subscription handshake and event delivery
// ABOUTME: Verifies signatures on the raw body and hands activity creations to a detached ingestion task
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Webhook routes
//!
//! The POST handler answers 200 as soon as the event is accepted. Ingestion
//! runs on its own task and reports failures through the ingestion log.

use crate::constants::webhook::SIGNATURE_HEADER;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::resources::ServerResources;
use crate::webhook::{VerificationQuery, WebhookEvent};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Webhook routes implementation
pub struct WebhookRoutes;

impl WebhookRoutes {
    /// Create the webhook routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/webhook",
                get(Self::handle_verification).post(Self::handle_event),
            )
            .with_state(resources)
    }

    async fn handle_verification(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<VerificationQuery>,
    ) -> AppResult<Json<Value>> {
        match query.accepted_challenge(&resources.webhook_config.verify_token) {
            Some(challenge) => Ok(Json(json!({ "hub.challenge": challenge }))),
            None => {
                AppLogger::log_security_event(
                    "webhook_verification_rejected",
                    &format!("mode={:?}", query.mode),
                );
                Err(AppError::permission_denied("Webhook verification failed"))
            }
        }
    }

    async fn handle_event(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> AppResult<StatusCode> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        let validation = resources.webhook_validator.validate(signature, &body);
        if !validation.is_accepted() {
            AppLogger::log_security_event("webhook_signature_invalid", "signature mismatch");
            return Err(AppError::auth_invalid("Invalid webhook signature"));
        }

        let event: WebhookEvent = serde_json::from_slice(&body)
            .map_err(|e| AppError::invalid_input(format!("Invalid webhook payload: {e}")))?;
        AppLogger::log_webhook_event(&event.object_type, &event.aspect_type, event.object_id);

        if event.is_activity_create() {
            let ingestor = resources.ingestor.clone();
            let activity_id = event.object_id;
            tokio::spawn(async move {
                // Outcome and failures are logged inside ingest_by_id
                let _ = ingestor.ingest_by_id(activity_id, "webhook").await;
            });
        } else {
            debug!(
                object_type = %event.object_type,
                aspect_type = %event.aspect_type,
                "Ignoring webhook event"
            );
        }

        Ok(StatusCode::OK)
    }
}
