// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed server, store, Strava, webhook, and goal settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{defaults, env_config, redis, strava};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use streak_core::fields::METERS_PER_KM;
use streak_core::QualifyingRule;
use tracing::{info, warn};

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Public base URL used for OAuth and webhook callbacks
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// State store settings
    pub store: StoreConfig,
    /// Strava OAuth and API settings
    pub strava: StravaApiConfig,
    /// Webhook secrets supplied by the operator
    pub webhook: WebhookSeedConfig,
    /// Admin API protection
    pub admin: AdminConfig,
    /// Background poller
    pub polling: PollingConfig,
    /// Qualifying rule, goals, and description behavior
    pub streak: StreakSettings,
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis URL; memory only when absent
    pub redis_url: Option<String>,
    /// Namespace prefix applied to every Redis key
    pub key_prefix: String,
    /// Connection tuning
    pub redis_connection: RedisConnectionConfig,
}

/// Redis connection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConnectionConfig {
    /// Connect timeout in seconds
    pub connection_timeout_secs: u64,
    /// Per-command response timeout in seconds
    pub response_timeout_secs: u64,
    /// Attempts on startup before giving up
    pub initial_connection_retries: u32,
    /// First retry delay in milliseconds
    pub initial_retry_delay_ms: u64,
    /// Retry delay cap in milliseconds
    pub max_retry_delay_ms: u64,
    /// Reconnection attempts the connection manager makes per command
    pub reconnection_retries: usize,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: redis::CONNECTION_TIMEOUT_SECS,
            response_timeout_secs: redis::RESPONSE_TIMEOUT_SECS,
            initial_connection_retries: redis::INITIAL_CONNECTION_RETRIES,
            initial_retry_delay_ms: redis::INITIAL_RETRY_DELAY_MS,
            max_retry_delay_ms: redis::MAX_RETRY_DELAY_MS,
            reconnection_retries: redis::RECONNECTION_RETRIES,
        }
    }
}

/// Strava OAuth and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaApiConfig {
    /// OAuth client ID
    pub client_id: Option<String>,
    /// OAuth client secret
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// OAuth redirect URI
    pub redirect_uri: String,
    /// Strava API base URL
    pub base_url: String,
    /// Strava auth URL
    pub auth_url: String,
    /// Strava token URL
    pub token_url: String,
    /// Requested scopes
    pub scopes: Vec<String>,
}

impl StravaApiConfig {
    /// Whether client credentials are present
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// Webhook secrets provided through the environment
///
/// Missing values are generated and persisted on first start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSeedConfig {
    /// Verify token echoed in the subscription handshake
    #[serde(skip_serializing)]
    pub verify_token: Option<String>,
    /// HMAC-SHA1 key for `x-strava-signature`
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
}

/// Admin API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer key required on `/api/*`; open when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Background poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between polls; 0 disables the poller
    pub interval_secs: u64,
    /// Window searched when no watermark exists
    pub lookback_hours: u64,
}

impl PollingConfig {
    /// Whether the poller should run
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.interval_secs > 0
    }
}

/// Streak rules and goals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakSettings {
    /// Which activities count as runs
    pub qualifying_rule: QualifyingRule,
    /// Monthly goal in meters applied to fresh state
    pub monthly_goal_meters: f64,
    /// Yearly goal in meters applied to fresh state
    pub yearly_goal_meters: f64,
    /// Push rendered descriptions back to Strava
    pub update_descriptions: bool,
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            qualifying_rule: QualifyingRule::default(),
            monthly_goal_meters: defaults::MONTHLY_GOAL_KM * METERS_PER_KM,
            yearly_goal_meters: defaults::YEARLY_GOAL_KM * METERS_PER_KM,
            update_descriptions: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let base_url = format!("http://localhost:{}", defaults::HTTP_PORT);
        Self {
            http_port: defaults::HTTP_PORT,
            strava: StravaApiConfig {
                client_id: None,
                client_secret: None,
                redirect_uri: format!("{base_url}/auth/strava/callback"),
                base_url: strava::API_BASE.to_owned(),
                auth_url: strava::AUTH_URL.to_owned(),
                token_url: strava::TOKEN_URL.to_owned(),
                scopes: parse_list(strava::SCOPES),
            },
            base_url,
            environment: Environment::Development,
            store: StoreConfig {
                redis_url: None,
                key_prefix: defaults::STORE_KEY_PREFIX.to_owned(),
                redis_connection: RedisConnectionConfig::default(),
            },
            webhook: WebhookSeedConfig::default(),
            admin: AdminConfig::default(),
            polling: PollingConfig {
                interval_secs: defaults::POLL_INTERVAL_SECS,
                lookback_hours: defaults::POLL_LOOKBACK_HOURS,
            },
            streak: StreakSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value or the result fails validation
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            http_port: env_config::http_port(),
            base_url: env_config::base_url(),
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),

            store: StoreConfig {
                redis_url: env_config::redis_url(),
                key_prefix: env_var_or("STORE_KEY_PREFIX", defaults::STORE_KEY_PREFIX),
                redis_connection: RedisConnectionConfig::default(),
            },

            strava: StravaApiConfig {
                client_id: env_config::strava_client_id(),
                client_secret: env_config::strava_client_secret(),
                redirect_uri: env_config::strava_redirect_uri(),
                base_url: env_config::strava_api_base(),
                auth_url: env_config::strava_auth_url(),
                token_url: env_config::strava_token_url(),
                scopes: parse_list(&env_var_or("STRAVA_SCOPES", strava::SCOPES)),
            },

            webhook: WebhookSeedConfig {
                verify_token: optional_env("WEBHOOK_VERIFY_TOKEN"),
                signing_secret: optional_env("WEBHOOK_SIGNING_SECRET"),
            },

            admin: AdminConfig {
                api_key: optional_env("ADMIN_API_KEY"),
            },

            polling: PollingConfig {
                interval_secs: parse_env("POLL_INTERVAL_SECS", defaults::POLL_INTERVAL_SECS)?,
                lookback_hours: parse_env("POLL_LOOKBACK_HOURS", defaults::POLL_LOOKBACK_HOURS)?,
            },

            streak: StreakSettings {
                qualifying_rule: QualifyingRule {
                    activity_types: parse_list(&env_var_or(
                        "QUALIFYING_ACTIVITY_TYPES",
                        defaults::QUALIFYING_ACTIVITY_TYPES,
                    )),
                    min_distance_meters: parse_env(
                        "MIN_RUN_DISTANCE_METERS",
                        defaults::MIN_RUN_DISTANCE_METERS,
                    )?,
                },
                monthly_goal_meters: parse_env("MONTHLY_GOAL_KM", defaults::MONTHLY_GOAL_KM)?
                    * METERS_PER_KM,
                yearly_goal_meters: parse_env("YEARLY_GOAL_KM", defaults::YEARLY_GOAL_KM)?
                    * METERS_PER_KM,
                update_descriptions: parse_env("UPDATE_DESCRIPTIONS", true)?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).context("BASE_URL is not a valid URL")?;
        url::Url::parse(&self.strava.base_url).context("STRAVA_API_BASE is not a valid URL")?;

        if self.streak.qualifying_rule.activity_types.is_empty() {
            return Err(anyhow::anyhow!(
                "QUALIFYING_ACTIVITY_TYPES must name at least one activity type"
            ));
        }

        let min_distance = self.streak.qualifying_rule.min_distance_meters;
        if !min_distance.is_finite() || min_distance < 0.0 {
            return Err(anyhow::anyhow!(
                "MIN_RUN_DISTANCE_METERS must be a non-negative number"
            ));
        }

        for (name, goal) in [
            ("MONTHLY_GOAL_KM", self.streak.monthly_goal_meters),
            ("YEARLY_GOAL_KM", self.streak.yearly_goal_meters),
        ] {
            if !goal.is_finite() || goal <= 0.0 {
                return Err(anyhow::anyhow!("{name} must be a positive number"));
            }
        }

        if !self.strava.has_credentials() {
            warn!("STRAVA_CLIENT_ID or STRAVA_CLIENT_SECRET missing; OAuth and API calls will fail");
        }

        if self.admin.api_key.is_none() && self.environment.is_production() {
            warn!("ADMIN_API_KEY not set; admin endpoints are unauthenticated");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Run Streak Configuration:\n\
             - HTTP Port: {}\n\
             - Base URL: {}\n\
             - Environment: {}\n\
             - State Store: {}\n\
             - Strava OAuth: {}\n\
             - Webhook Secrets: {}\n\
             - Admin API Key: {}\n\
             - Poller: {}\n\
             - Qualifying Types: {}\n\
             - Min Distance: {} m\n\
             - Goals: {:.0} km/month, {:.0} km/year\n\
             - Update Descriptions: {}",
            self.http_port,
            self.base_url,
            self.environment,
            if self.store.redis_url.is_some() {
                "Redis with memory fallback"
            } else {
                "In-memory"
            },
            if self.strava.has_credentials() {
                "Enabled"
            } else {
                "Disabled"
            },
            if self.webhook.verify_token.is_some() {
                "From environment"
            } else {
                "Stored or generated"
            },
            if self.admin.api_key.is_some() {
                "Set"
            } else {
                "Not set"
            },
            if self.polling.enabled() {
                format!("every {}s", self.polling.interval_secs)
            } else {
                "Disabled".to_owned()
            },
            self.streak.qualifying_rule.activity_types.join(", "),
            self.streak.qualifying_rule.min_distance_meters,
            self.streak.monthly_goal_meters / METERS_PER_KM,
            self.streak.yearly_goal_meters / METERS_PER_KM,
            self.streak.update_descriptions,
        )
    }

    /// Webhook callback URL registered with Strava
    #[must_use]
    pub fn webhook_callback_url(&self) -> String {
        format!("{}/webhook", self.base_url.trim_end_matches('/'))
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-blank environment variable
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, using `default` when unset or blank
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value '{raw}'")),
        None => Ok(default),
    }
}

/// Parse a comma-separated list
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}
