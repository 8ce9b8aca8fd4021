// ABOUTME: OAuth2 client for Strava authorization-code and refresh-token exchanges
// ABOUTME: Builds the authorize URL and maps token endpoint rejections to re-authentication errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::environment::StravaApiConfig;
use crate::constants::{strava, timeouts};
use crate::errors::{AppError, AppResult};
use crate::utils::http_client::oauth_client;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// OAuth 2.0 client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// OAuth client ID from provider
    pub client_id: String,
    /// OAuth client secret from provider
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Redirect URI for OAuth callbacks
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Build from the Strava section of the server configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when client credentials are missing
    pub fn from_strava(config: &StravaApiConfig) -> AppResult<Self> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        else {
            return Err(AppError::config(
                "STRAVA_CLIENT_ID and STRAVA_CLIENT_SECRET must be set",
            ));
        };
        Ok(Self {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        })
    }
}

/// OAuth 2.0 access token with expiration and refresh capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    /// The access token string
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiration timestamp (UTC)
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for getting new access tokens
    pub refresh_token: Option<String>,
    /// Granted OAuth scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// Athlete the tokens belong to
    #[serde(default)]
    pub athlete_id: Option<i64>,
}

impl OAuth2Token {
    /// Check if the token is expired at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Check if the token expires within the refresh margin of `now`
    #[must_use]
    pub fn will_expire_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            expires_at <= now + Duration::seconds(timeouts::TOKEN_REFRESH_MARGIN_SECS)
        })
    }
}

/// Summary of the athlete returned with a Strava token
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AthleteSummary {
    /// Strava athlete ID
    pub id: i64,
    /// Athlete's username
    pub username: Option<String>,
    /// Athlete's first name
    pub firstname: Option<String>,
    /// Athlete's last name
    pub lastname: Option<String>,
}

/// Strava token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    /// Unix timestamp when the token expires
    expires_at: Option<i64>,
    /// Token lifetime in seconds
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    athlete: Option<AthleteSummary>,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

/// Exchanges refresh tokens for new access tokens
///
/// Split out of [`OAuth2Client`] so the token manager can be driven by a
/// test double.
#[async_trait::async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a refresh token
    ///
    /// # Errors
    ///
    /// Returns `ExternalAuthFailed` when the provider rejects the refresh token
    async fn refresh(&self, refresh_token: &str) -> AppResult<OAuth2Token>;
}

/// OAuth 2.0 client for Strava
pub struct OAuth2Client {
    config: OAuth2Config,
    client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new `OAuth2` client with the given configuration
    #[must_use]
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            client: oauth_client(),
        }
    }

    /// Get the `OAuth2` configuration
    #[must_use]
    pub const fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Get authorization URL
    ///
    /// Strava expects comma-separated scopes and `approval_prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization URL is malformed
    pub fn get_authorization_url(&self, state: &str) -> AppResult<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AppError::config(format!("Invalid STRAVA_AUTH_URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("approval_prompt", "auto")
            .append_pair("scope", &self.config.scopes.join(","))
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchange authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects the code
    pub async fn exchange_code(
        &self,
        code: &str,
    ) -> AppResult<(OAuth2Token, Option<AthleteSummary>)> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let response = self.post_token(&params).await?;
        let athlete = response.athlete.clone();
        Ok((Self::token_from_response(response, None), athlete))
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            400 | 401 => Err(AppError::auth_expired(strava::PROVIDER).with_upstream_status(status.as_u16())),
            429 => Err(AppError::rate_limited(strava::PROVIDER)),
            code => Err(AppError::external_service(
                strava::PROVIDER,
                format!("token endpoint returned {code}: {body}"),
            )
            .with_upstream_status(code)),
        }
    }

    fn token_from_response(response: TokenResponse, previous_refresh: Option<&str>) -> OAuth2Token {
        let now = Utc::now();
        let expires_at = response
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| response.expires_in.map(|secs| now + Duration::seconds(secs)));

        OAuth2Token {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response
                .refresh_token
                .or_else(|| previous_refresh.map(ToOwned::to_owned)),
            scope: response.scope,
            athlete_id: response.athlete.map(|a| a.id),
        }
    }
}

#[async_trait::async_trait]
impl TokenEndpoint for OAuth2Client {
    async fn refresh(&self, refresh_token: &str) -> AppResult<OAuth2Token> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token(&params).await?;
        Ok(Self::token_from_response(response, Some(refresh_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuth2Config {
        OAuth2Config {
            client_id: "12345".to_owned(),
            client_secret: "secret".to_owned(),
            auth_url: strava::AUTH_URL.to_owned(),
            token_url: strava::TOKEN_URL.to_owned(),
            redirect_uri: "http://localhost:8080/auth/strava/callback".to_owned(),
            scopes: vec!["read".to_owned(), "activity:write".to_owned()],
        }
    }

    #[test]
    fn test_authorization_url_contains_comma_scopes() {
        let client = OAuth2Client::new(config());
        let url = client.get_authorization_url("xyz").unwrap_or_default();
        assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
        assert!(url.contains("client_id=12345"));
        assert!(url.contains("scope=read%2Cactivity%3Awrite"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_token_expiry_margin() {
        let now = Utc::now();
        let token = OAuth2Token {
            access_token: "a".to_owned(),
            token_type: "Bearer".to_owned(),
            expires_at: Some(now + Duration::minutes(4)),
            refresh_token: Some("r".to_owned()),
            scope: None,
            athlete_id: None,
        };
        assert!(!token.is_expired(now));
        assert!(token.will_expire_soon(now));
        assert!(!token.will_expire_soon(now - Duration::minutes(2)));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token_when_omitted() {
        let response = TokenResponse {
            access_token: "new".to_owned(),
            token_type: "Bearer".to_owned(),
            expires_at: Some(1_900_000_000),
            expires_in: None,
            refresh_token: None,
            scope: None,
            athlete: None,
        };
        let token = OAuth2Client::token_from_response(response, Some("old-refresh"));
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_at.map(|t| t.timestamp()), Some(1_900_000_000));
    }
}
