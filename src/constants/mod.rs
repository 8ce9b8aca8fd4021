// ABOUTME: Application constants grouped by domain
// ABOUTME: Environment lookups with defaults, store keys, Strava endpoints, timeouts, and limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into small domain modules rather than one flat list.

use std::env;

/// Environment-based configuration
pub mod env_config {
    use super::env;
    use super::{defaults, strava};

    /// Get HTTP server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::HTTP_PORT)
    }

    /// Get public base URL from environment or default
    #[must_use]
    pub fn base_url() -> String {
        env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", http_port()))
    }

    /// Get Strava redirect URI from environment or default
    #[must_use]
    pub fn strava_redirect_uri() -> String {
        env::var("STRAVA_REDIRECT_URI")
            .unwrap_or_else(|_| format!("{}/auth/strava/callback", base_url()))
    }

    /// Get Strava authorization URL from environment or default
    #[must_use]
    pub fn strava_auth_url() -> String {
        env::var("STRAVA_AUTH_URL").unwrap_or_else(|_| strava::AUTH_URL.to_owned())
    }

    /// Get Strava token URL from environment or default
    #[must_use]
    pub fn strava_token_url() -> String {
        env::var("STRAVA_TOKEN_URL").unwrap_or_else(|_| strava::TOKEN_URL.to_owned())
    }

    /// Get `Strava` API base URL from environment or default
    #[must_use]
    pub fn strava_api_base() -> String {
        env::var("STRAVA_API_BASE").unwrap_or_else(|_| strava::API_BASE.to_owned())
    }

    /// Get Strava client ID from environment
    #[must_use]
    pub fn strava_client_id() -> Option<String> {
        non_empty("STRAVA_CLIENT_ID")
    }

    /// Get Strava client secret from environment
    #[must_use]
    pub fn strava_client_secret() -> Option<String> {
        non_empty("STRAVA_CLIENT_SECRET")
    }

    /// Get Redis URL from environment
    #[must_use]
    pub fn redis_url() -> Option<String> {
        non_empty("REDIS_URL")
    }

    fn non_empty(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Default configuration values
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8080;
    /// Default namespace prefix for Redis keys
    pub const STORE_KEY_PREFIX: &str = "run-streak:";
    /// Default qualifying activity types (comma separated)
    pub const QUALIFYING_ACTIVITY_TYPES: &str = "Run";
    /// Default minimum qualifying distance in meters
    pub const MIN_RUN_DISTANCE_METERS: f64 = 0.0;
    /// Default monthly goal in kilometers
    pub const MONTHLY_GOAL_KM: f64 = 200.0;
    /// Default yearly goal in kilometers
    pub const YEARLY_GOAL_KM: f64 = 2000.0;
    /// Poller disabled unless configured
    pub const POLL_INTERVAL_SECS: u64 = 0;
    /// Window searched on the first poll when no watermark exists
    pub const POLL_LOOKBACK_HOURS: u64 = 48;
}

/// Logical records kept in the state store
pub mod store_keys {
    /// Combined streak + stats record
    pub const STREAK_RECORD: &str = "streak:record";
    /// OAuth token set
    pub const STRAVA_TOKENS: &str = "strava:tokens";
    /// Webhook verify token and signing secret
    pub const WEBHOOK_CONFIG: &str = "webhook:config";
    /// Dedup watermark kept outside the record by earlier releases
    pub const LEGACY_LAST_PROCESSED_ACTIVITY: &str = "activity:last_processed";
}

/// Strava endpoints and OAuth settings
pub mod strava {
    /// Provider name used in logs and errors
    pub const PROVIDER: &str = "Strava";
    /// REST API base
    pub const API_BASE: &str = "https://www.strava.com/api/v3";
    /// OAuth authorization endpoint
    pub const AUTH_URL: &str = "https://www.strava.com/oauth/authorize";
    /// OAuth token endpoint
    pub const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
    /// Scopes needed to read activities and write descriptions
    pub const SCOPES: &str = "read,activity:read_all,activity:write";
    /// Push subscription endpoint path under the API base
    pub const PUSH_SUBSCRIPTIONS_PATH: &str = "/push_subscriptions";
    /// Page size for activity listings
    pub const ACTIVITIES_PER_PAGE: u32 = 100;
}

/// Webhook protocol constants
pub mod webhook {
    /// Signature header
    pub const SIGNATURE_HEADER: &str = "x-strava-signature";
    /// Optional prefix on the signature value
    pub const SIGNATURE_PREFIX: &str = "sha1=";
    /// Handshake mode value
    pub const SUBSCRIBE_MODE: &str = "subscribe";
    /// Length in bytes of generated verify tokens and secrets before hex encoding
    pub const GENERATED_SECRET_BYTES: usize = 32;
}

/// Timeout configurations
pub mod timeouts {
    /// Default HTTP client timeout in seconds
    pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 30;
    /// HTTP client connect timeout in seconds
    pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Refresh tokens that expire within this many seconds
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;
    /// Grace period for in-flight requests on shutdown
    pub const SHUTDOWN_GRACE_SECS: u64 = 10;
    /// Lifetime of an OAuth `state` value issued by `/auth/strava`
    pub const OAUTH_STATE_TTL_SECS: i64 = 600;
}

/// Redis connection tuning
pub mod redis {
    /// Connect timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 5;
    /// Per-command response timeout in seconds
    pub const RESPONSE_TIMEOUT_SECS: u64 = 3;
    /// Attempts made on startup before falling back to memory
    pub const INITIAL_CONNECTION_RETRIES: u32 = 2;
    /// Delay before the first retry in milliseconds
    pub const INITIAL_RETRY_DELAY_MS: u64 = 250;
    /// Upper bound for the retry delay in milliseconds
    pub const MAX_RETRY_DELAY_MS: u64 = 2_000;
    /// Background reconnection attempts per command
    pub const RECONNECTION_RETRIES: usize = 3;
    /// Keys fetched per SCAN iteration
    pub const SCAN_COUNT: usize = 100;
}

/// Service identity
pub mod service {
    /// Service name reported in health responses and the generated signature
    pub const NAME: &str = "run-streak";
    /// Crate version
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
