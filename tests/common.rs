// ABOUTME: Shared test utilities and fakes for integration tests
// ABOUTME: Fake fitness API and token endpoint, activity builders, and in-memory resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `run_streak`

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use run_streak::{
    config::ServerConfig,
    errors::{AppError, AppResult},
    ingest::ActivityIngestor,
    oauth2_client::{OAuth2Token, TokenEndpoint, TokenManager},
    providers::FitnessApi,
    resources::ServerResources,
    store::{InMemoryStore, SharedStore, StateRepository},
    webhook::{WebhookConfig, WebhookSignatureValidator},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use streak_core::{Activity, Clock, FixedClock};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// UTC instant at 07:00 on the given day
pub fn morning(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 7, 0, 0).unwrap()
}

/// Activity of any type starting at 07:00 on the given day
pub fn activity(id: u64, activity_type: &str, y: i32, m: u32, d: u32, km: f64) -> Activity {
    Activity {
        id,
        name: format!("{activity_type} {id}"),
        activity_type: activity_type.to_owned(),
        start_date: morning(y, m, d),
        start_date_local: Some(morning(y, m, d)),
        distance: km * 1000.0,
        moving_time: Some(1800),
        elapsed_time: Some(1900),
        total_elevation_gain: Some(25.0),
        description: None,
    }
}

/// Run starting at 07:00 on the given day
pub fn run(id: u64, y: i32, m: u32, d: u32, km: f64) -> Activity {
    activity(id, "Run", y, m, d, km)
}

/// In-memory fitness API recording description pushes
#[derive(Default)]
pub struct FakeFitnessApi {
    activities: DashMap<u64, Activity>,
    pub pushed: Mutex<Vec<(u64, String)>>,
    pub fail_updates: AtomicBool,
    pub fail_listing: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl FakeFitnessApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activities(activities: impl IntoIterator<Item = Activity>) -> Self {
        let api = Self::new();
        for activity in activities {
            api.insert(activity);
        }
        api
    }

    pub fn insert(&self, activity: Activity) {
        self.activities.insert(activity.id, activity);
    }

    pub fn pushed(&self) -> Vec<(u64, String)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FitnessApi for FakeFitnessApi {
    async fn get_activity(&self, id: u64) -> AppResult<Activity> {
        self.activities
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Activity {id}")))
    }

    async fn list_activities_after(&self, after_unix_ts: i64) -> AppResult<Vec<Activity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AppError::external_service("Strava API", "listing failed"));
        }
        let mut found: Vec<Activity> = self
            .activities
            .iter()
            .filter(|entry| entry.start_date.timestamp() > after_unix_ts)
            .map(|entry| entry.value().clone())
            .collect();
        // Newest first, like the real API without a sort parameter
        found.sort_by_key(|a| std::cmp::Reverse(a.start_date));
        Ok(found)
    }

    async fn update_activity_description(&self, id: u64, description: &str) -> AppResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::external_service("Strava API", "update failed").with_upstream_status(500));
        }
        if let Some(mut entry) = self.activities.get_mut(&id) {
            entry.description = Some(description.to_owned());
        }
        self.pushed
            .lock()
            .unwrap()
            .push((id, description.to_owned()));
        Ok(())
    }
}

/// Token endpoint that counts refreshes and hands out numbered tokens
#[derive(Default)]
pub struct FakeTokenEndpoint {
    pub refreshes: AtomicUsize,
    pub reject: AtomicBool,
}

#[async_trait::async_trait]
impl TokenEndpoint for FakeTokenEndpoint {
    async fn refresh(&self, refresh_token: &str) -> AppResult<OAuth2Token> {
        // Give concurrent callers a chance to pile up on the refresh lock
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if self.reject.load(Ordering::SeqCst) {
            return Err(AppError::auth_expired("Strava"));
        }
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OAuth2Token {
            access_token: format!("access-{n}"),
            token_type: "Bearer".to_owned(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(6)),
            refresh_token: Some(refresh_token.to_owned()),
            scope: None,
            athlete_id: None,
        })
    }
}

/// Token set expiring `hours` from now
pub fn token(access: &str, hours: i64) -> OAuth2Token {
    OAuth2Token {
        access_token: access.to_owned(),
        token_type: "Bearer".to_owned(),
        expires_at: Some(Utc::now() + chrono::Duration::hours(hours)),
        refresh_token: Some("refresh-1".to_owned()),
        scope: Some("read,activity:read_all,activity:write".to_owned()),
        athlete_id: Some(42),
    }
}

/// Repository over a fresh in-memory store with the default goals
pub fn memory_repository() -> StateRepository {
    let store: SharedStore = Arc::new(InMemoryStore::new());
    StateRepository::new(store, 200_000.0, 2_000_000.0)
}

/// Ingestor over the fake API with a pinned clock
pub fn ingestor(
    api: Arc<FakeFitnessApi>,
    repository: StateRepository,
    now: DateTime<Utc>,
    update_descriptions: bool,
) -> ActivityIngestor {
    ActivityIngestor::new(
        api,
        repository,
        streak_core::QualifyingRule::default(),
        Arc::new(FixedClock(now)),
        update_descriptions,
    )
}

/// Route-level resources around the fake API
pub fn resources(
    api: Arc<FakeFitnessApi>,
    now: DateTime<Utc>,
    configure: impl FnOnce(&mut ServerConfig),
) -> Arc<ServerResources> {
    init_test_logging();
    let mut config = ServerConfig::default();
    configure(&mut config);

    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let repository = memory_repository();
    let webhook_config = WebhookConfig {
        verify_token: "verify-me".to_owned(),
        signing_secret: config.webhook.signing_secret.clone(),
        created_at: now,
    };

    Arc::new(ServerResources {
        token_manager: Arc::new(TokenManager::new(
            repository.clone(),
            Arc::new(FakeTokenEndpoint::default()),
            clock.clone(),
        )),
        ingestor: Arc::new(ActivityIngestor::new(
            api,
            repository.clone(),
            config.streak.qualifying_rule.clone(),
            clock.clone(),
            config.streak.update_descriptions,
        )),
        repository,
        oauth_client: None,
        subscriptions: None,
        webhook_validator: WebhookSignatureValidator::new(webhook_config.signing_secret.clone()),
        webhook_config,
        oauth_states: DashMap::new(),
        config: Arc::new(config),
        clock,
    })
}
