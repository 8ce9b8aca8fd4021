// ABOUTME: Strava API client for activity reads and description updates
// ABOUTME: Every request retries once with a refreshed token after a 401
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FitnessApi;
use crate::constants::strava::{ACTIVITIES_PER_PAGE, PROVIDER};
use crate::errors::{AppError, AppResult};
use crate::oauth2_client::AccessTokenSource;
use crate::utils::http_client::shared_client;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use streak_core::Activity;
use tracing::{debug, error, info, warn};

/// Strava REST client
pub struct StravaClient {
    base_url: String,
    client: Client,
    tokens: Arc<dyn AccessTokenSource>,
}

impl StravaClient {
    /// Create a client for `base_url` (normally `https://www.strava.com/api/v3`)
    #[must_use]
    pub fn new(base_url: &str, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: shared_client().clone(),
            tokens,
        }
    }

    /// Send an authenticated request, retrying exactly once after a 401
    async fn send<F>(&self, build: F) -> AppResult<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder + Send + Sync,
    {
        let token = self.tokens.access_token().await?;
        let response = build(&self.client, &token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(response).await;
        }

        info!("Strava returned 401, refreshing token and retrying once");
        let fresh = self.tokens.refresh_after_unauthorized(&token).await?;
        let retry = build(&self.client, &fresh).send().await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::auth_expired(PROVIDER).with_upstream_status(401));
        }
        Self::check_status(retry).await
    }

    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|e| {
            warn!("Failed to read error response body: {}", e);
            String::new()
        });
        error!("Strava API error response: {} - {}", status, body);

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => AppError::rate_limited(PROVIDER),
            StatusCode::NOT_FOUND => AppError::not_found("Strava activity"),
            _ => AppError::external_service(PROVIDER, format!("{status}: {body}"))
                .with_upstream_status(status.as_u16()),
        })
    }
}

#[async_trait::async_trait]
impl FitnessApi for StravaClient {
    async fn get_activity(&self, id: u64) -> AppResult<Activity> {
        let url = format!("{}/activities/{id}", self.base_url);
        let response = self
            .send(|client, token| client.get(&url).bearer_auth(token))
            .await?;
        let activity: StravaActivity = response.json().await?;
        Ok(activity.into())
    }

    async fn list_activities_after(&self, after_unix_ts: i64) -> AppResult<Vec<Activity>> {
        let url = format!("{}/athlete/activities", self.base_url);
        let mut activities = Vec::new();
        let mut page = 1u32;

        loop {
            let query = [
                ("after", after_unix_ts.to_string()),
                ("per_page", ACTIVITIES_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let response = self
                .send(|client, token| client.get(&url).bearer_auth(token).query(&query))
                .await?;
            let batch: Vec<StravaActivity> = response.json().await?;
            let count = batch.len();
            activities.extend(batch.into_iter().map(Activity::from));

            if count < ACTIVITIES_PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        debug!(count = activities.len(), after = after_unix_ts, "Listed Strava activities");
        Ok(activities)
    }

    async fn update_activity_description(&self, id: u64, description: &str) -> AppResult<()> {
        let url = format!("{}/activities/{id}", self.base_url);
        let body = serde_json::json!({ "description": description });
        self.send(|client, token| {
            client
                .request(Method::PUT, &url)
                .bearer_auth(token)
                .json(&body)
        })
        .await?;
        info!(activity_id = id, "Updated Strava activity description");
        Ok(())
    }
}

/// Activity as returned by the Strava API
#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: u64,
    #[serde(default)]
    name: String,
    /// Legacy `type`, used first; `sport_type` only fills in when it is absent
    #[serde(rename = "type", default)]
    activity_type: Option<String>,
    #[serde(default)]
    sport_type: Option<String>,
    start_date: DateTime<Utc>,
    start_date_local: Option<DateTime<Utc>>,
    #[serde(default)]
    distance: Option<f64>,
    moving_time: Option<u64>,
    elapsed_time: Option<u64>,
    total_elevation_gain: Option<f64>,
    description: Option<String>,
}

impl From<StravaActivity> for Activity {
    fn from(strava: StravaActivity) -> Self {
        Self {
            id: strava.id,
            name: strava.name,
            activity_type: strava
                .activity_type
                .or(strava.sport_type)
                .unwrap_or_default(),
            start_date: strava.start_date,
            start_date_local: strava.start_date_local,
            distance: strava.distance.unwrap_or(0.0),
            moving_time: strava.moving_time,
            elapsed_time: strava.elapsed_time,
            total_elevation_gain: strava.total_elevation_gain,
            description: strava.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strava_activity_conversion() {
        let json = r#"{
            "id": 123,
            "name": "Lunch Run",
            "type": "Run",
            "sport_type": "TrailRun",
            "start_date": "2025-05-01T22:30:00Z",
            "start_date_local": "2025-05-01T18:30:00Z",
            "distance": 10000.0,
            "moving_time": 3000,
            "elapsed_time": 3100,
            "total_elevation_gain": 100.0,
            "description": null
        }"#;
        let parsed: StravaActivity = serde_json::from_str(json).unwrap();
        let activity: Activity = parsed.into();

        assert_eq!(activity.id, 123);
        assert_eq!(activity.activity_type, "Run");
        assert_eq!(activity.duration_seconds(), 3000);
        assert_eq!(
            activity.calendar_date(),
            chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_sport_type_used_when_type_missing() {
        let json = r#"{
            "id": 124,
            "sport_type": "TrailRun",
            "start_date": "2025-05-02T06:00:00Z",
            "distance": 8000.0
        }"#;
        let parsed: StravaActivity = serde_json::from_str(json).unwrap();
        let activity: Activity = parsed.into();

        assert_eq!(activity.activity_type, "TrailRun");
        assert_eq!(activity.start_date_local, None);
    }
}
