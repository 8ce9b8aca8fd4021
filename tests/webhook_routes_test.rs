// ABOUTME: HTTP-level tests for the webhook, health, and OAuth callback routes
// ABOUTME: Drives the axum router with oneshot requests over in-memory resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{morning, resources, run, FakeFitnessApi};
use run_streak::resources::ServerResources;
use run_streak::routes;
use run_streak::webhook;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "webhook-signing-secret";

fn setup(api: Arc<FakeFitnessApi>) -> (Arc<ServerResources>, Router) {
    let resources = resources(api, morning(2025, 3, 10), |config| {
        config.webhook.signing_secret = Some(SECRET.to_owned());
    });
    let router = routes::router(resources.clone());
    (resources, router)
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn signed_event(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-strava-signature", signature)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn test_handshake_echoes_challenge() -> Result<()> {
    let (_, app) = setup(Arc::new(FakeFitnessApi::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=abc123")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?, json!({ "hub.challenge": "abc123" }));
    Ok(())
}

#[tokio::test]
async fn test_handshake_with_wrong_token_is_forbidden() -> Result<()> {
    let (_, app) = setup(Arc::new(FakeFitnessApi::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=abc123")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_event_with_bad_signature_is_rejected() -> Result<()> {
    let (resources, app) = setup(Arc::new(FakeFitnessApi::with_activities([run(
        1, 2025, 3, 10, 5.0,
    )])));
    let body = json!({"object_type": "activity", "aspect_type": "create", "object_id": 1}).to_string();

    let response = app.oneshot(signed_event(&body, "deadbeef")).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = body_json(response).await?;
    assert_eq!(error["error"]["code"], "AUTH_INVALID");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(resources.repository.load_watermark().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_signed_activity_create_is_ingested() -> Result<()> {
    let api = Arc::new(FakeFitnessApi::with_activities([run(1, 2025, 3, 10, 5.0)]));
    let (resources, app) = setup(api.clone());
    let body = json!({
        "object_type": "activity",
        "aspect_type": "create",
        "object_id": 1,
        "owner_id": 42,
        "event_time": 1_741_590_000,
        "subscription_id": 7
    })
    .to_string();
    let signature = format!("sha1={}", webhook::sign(SECRET, body.as_bytes()));

    let response = app.oneshot(signed_event(&body, &signature)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Ingestion runs detached from the request
    let mut streak = 0;
    for _ in 0..50 {
        streak = resources.repository.load_record().await?.streak.current_streak;
        if streak > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(streak, 1);
    assert_eq!(api.pushed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_non_activity_event_is_acknowledged_and_ignored() -> Result<()> {
    let (resources, app) = setup(Arc::new(FakeFitnessApi::new()));
    let body = json!({
        "object_type": "athlete",
        "aspect_type": "update",
        "object_id": 42,
        "updates": {"authorized": "false"}
    })
    .to_string();
    let signature = webhook::sign(SECRET, body.as_bytes());

    let response = app.oneshot(signed_event(&body, &signature)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(resources.repository.load_watermark().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() -> Result<()> {
    let (_, app) = setup(Arc::new(FakeFitnessApi::new()));
    let body = "{\"object_type\": \"activity\"";
    let signature = webhook::sign(SECRET, body.as_bytes());

    let response = app.oneshot(signed_event(body, &signature)).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_health_and_ready() -> Result<()> {
    let (_, app) = setup(Arc::new(FakeFitnessApi::new()));

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await?["service"], "run-streak");

    let ready = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty())?)
        .await?;
    assert_eq!(ready.status(), StatusCode::OK);
    let body = body_json(ready).await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["strava_connected"], false);
    Ok(())
}

#[tokio::test]
async fn test_oauth_callback_rejects_unknown_state() -> Result<()> {
    let (resources, app) = setup(Arc::new(FakeFitnessApi::new()));

    let denied = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/strava/callback?error=access_denied&state=x")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let forged = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/strava/callback?code=abc&state=forged")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    // A genuine state is consumed once, then fails at the missing client
    let state = resources.issue_oauth_state();
    let uri = format!("/auth/strava/callback?code=abc&state={state}");
    let first = app
        .clone()
        .oneshot(Request::builder().uri(&uri).body(Body::empty())?)
        .await?;
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let replay = app
        .oneshot(Request::builder().uri(&uri).body(Body::empty())?)
        .await?;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
