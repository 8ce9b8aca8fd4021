// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Liveness plus readiness reporting the state store backend and Strava connection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::service;
use crate::resources::ServerResources;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "service": service::NAME,
            "version": service::VERSION,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    /// Ready while the store answers; a degraded Redis still serves from memory
    async fn handle_ready(State(resources): State<Arc<ServerResources>>) -> (StatusCode, Json<Value>) {
        let store = resources.repository.store();
        let store_health = store.health_check().await;
        let strava_connected = resources.token_manager.is_connected().await;

        let status = match (&store_health, &strava_connected) {
            (Ok(()), Ok(_)) => "ready",
            (Err(_), Ok(_)) => "degraded",
            (_, Err(_)) => "unavailable",
        };
        let code = if strava_connected.is_ok() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        (
            code,
            Json(json!({
                "status": status,
                "store": {
                    "backend": store.backend_name(),
                    "healthy": store_health.is_ok(),
                    "error": store_health.err().map(|e| e.to_string()),
                },
                "strava_connected": strava_connected.unwrap_or(false),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
    }
}
