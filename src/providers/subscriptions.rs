// ABOUTME: Strava push subscription management for webhook registration
// ABOUTME: Create, list, and delete subscriptions authenticated with client credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::strava::{PROVIDER, PUSH_SUBSCRIPTIONS_PATH};
use crate::errors::{AppError, AppResult};
use crate::oauth2_client::OAuth2Config;
use crate::utils::http_client::shared_client;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A registered push subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Subscription ID
    pub id: u64,
    /// Callback URL Strava posts events to
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Creation timestamp as reported by Strava
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp as reported by Strava
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Deserialize)]
struct CreatedSubscription {
    id: u64,
}

/// Push subscription API
///
/// Authenticated with the application's client ID and secret rather than an
/// athlete token.
pub struct WebhookSubscriptions {
    endpoint: String,
    client_id: String,
    client_secret: String,
    client: Client,
}

impl WebhookSubscriptions {
    /// Create a subscription client under `api_base`
    #[must_use]
    pub fn new(api_base: &str, oauth: &OAuth2Config) -> Self {
        Self {
            endpoint: format!(
                "{}{PUSH_SUBSCRIPTIONS_PATH}",
                api_base.trim_end_matches('/')
            ),
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            client: shared_client().clone(),
        }
    }

    /// Register `callback_url`; Strava verifies it with a GET handshake before answering
    ///
    /// # Errors
    ///
    /// Returns an error if Strava rejects the subscription
    pub async fn create(&self, callback_url: &str, verify_token: &str) -> AppResult<u64> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("callback_url", callback_url),
            ("verify_token", verify_token),
        ];
        let response = self.client.post(&self.endpoint).form(&params).send().await?;
        let created: CreatedSubscription = check(response).await?.json().await?;
        info!(subscription_id = created.id, callback_url = %callback_url, "Created push subscription");
        Ok(created.id)
    }

    /// List the application's subscriptions
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn list(&self) -> AppResult<Vec<PushSubscription>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.credentials())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Delete a subscription
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription does not exist or the request fails
    pub async fn delete(&self, id: u64) -> AppResult<()> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.endpoint))
            .query(&self.credentials())
            .send()
            .await?;
        check(response).await?;
        info!(subscription_id = id, "Deleted push subscription");
        Ok(())
    }

    fn credentials(&self) -> [(&str, &str); 2] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
    }
}

async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => AppError::not_found("Push subscription"),
        StatusCode::TOO_MANY_REQUESTS => AppError::rate_limited(PROVIDER),
        StatusCode::BAD_REQUEST => {
            AppError::invalid_input(format!("Strava rejected subscription request: {body}"))
        }
        _ => AppError::external_service(PROVIDER, format!("{status}: {body}"))
            .with_upstream_status(status.as_u16()),
    })
}
