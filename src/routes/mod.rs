// ABOUTME: Route module organization for the run streak HTTP endpoints
// ABOUTME: Combines health, webhook, OAuth, and admin routers with request tracing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! HTTP routes
//!
//! Each domain module exposes a `*Routes::routes` constructor; [`router`]
//! merges them into the service.

/// Admin API for status, manual edits, resets, and subscriptions
pub mod admin;
/// Strava authorization code flow
pub mod auth;
/// Health and readiness endpoints
pub mod health;
/// Strava webhook handshake and event delivery
pub mod webhook;

pub use admin::AdminRoutes;
pub use auth::AuthRoutes;
pub use health::HealthRoutes;
pub use webhook::WebhookRoutes;

use crate::resources::ServerResources;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the complete router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(WebhookRoutes::routes(resources.clone()))
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(AdminRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
}
