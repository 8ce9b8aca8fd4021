// ABOUTME: Shared HTTP clients for outbound Strava calls with pooling and timeouts
// ABOUTME: One process-wide API client plus a short-timeout client for OAuth token exchanges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::{service, timeouts};
use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

fn user_agent() -> String {
    format!("{}/{}", service::NAME, service::VERSION)
}

/// Get or create the shared HTTP client used for Strava API calls
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        create_client_with_timeout(
            timeouts::HTTP_CLIENT_TIMEOUT_SECS,
            timeouts::HTTP_CONNECT_TIMEOUT_SECS,
        )
    })
}

/// Create a new HTTP client with custom timeout settings
///
/// Falls back to a default client if the builder fails.
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .user_agent(user_agent())
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// HTTP client for OAuth token exchanges (15s request, 5s connect)
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(15, 5)
}
