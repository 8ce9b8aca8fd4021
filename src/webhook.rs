// ABOUTME: Strava webhook protocol: subscription handshake, event payloads, and signatures
// ABOUTME: HMAC-SHA1 body validation and persisted verify-token/secret management
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Webhook protocol
//!
//! Strava registers a callback with a GET handshake carrying `hub.mode`,
//! `hub.verify_token` and `hub.challenge`, then POSTs JSON events. Only
//! `activity`/`create` events lead to ingestion.

use crate::config::environment::WebhookSeedConfig;
use crate::constants::webhook::{GENERATED_SECRET_BYTES, SIGNATURE_PREFIX, SUBSCRIBE_MODE};
use crate::errors::AppResult;
use crate::store::StateRepository;
use chrono::{DateTime, Utc};
use rand::RngCore;
use ring::hmac;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Webhook signature validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureValidation {
    /// Signature is valid
    Valid,
    /// Signature is invalid
    Invalid,
    /// Signature header is missing
    Missing,
    /// No signing secret configured
    NotConfigured,
}

impl SignatureValidation {
    /// Whether the request may proceed
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Validates `x-strava-signature` headers
pub struct WebhookSignatureValidator {
    signing_secret: Option<String>,
}

impl WebhookSignatureValidator {
    /// Create a validator; `None` accepts every request
    #[must_use]
    pub const fn new(signing_secret: Option<String>) -> Self {
        Self { signing_secret }
    }

    /// Validate a raw body against the signature header
    ///
    /// The header is a hex HMAC-SHA1 of the body, optionally prefixed with `sha1=`.
    #[must_use]
    pub fn validate(&self, signature_header: Option<&str>, body: &[u8]) -> SignatureValidation {
        let Some(secret) = self.signing_secret.as_deref() else {
            return SignatureValidation::NotConfigured;
        };
        let Some(signature) = signature_header else {
            return SignatureValidation::Missing;
        };

        let provided = signature.trim();
        let provided = provided.strip_prefix(SIGNATURE_PREFIX).unwrap_or(provided);
        let provided = provided.to_ascii_lowercase();

        let expected = sign(secret, body);
        if subtle::ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
            SignatureValidation::Valid
        } else {
            SignatureValidation::Invalid
        }
    }
}

/// Hex HMAC-SHA1 of `body` under `secret`
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes());
    hex::encode(hmac::sign(&key, body).as_ref())
}

/// Query parameters of the subscription handshake
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationQuery {
    /// Must be `subscribe`
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// Must equal the configured verify token
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// Echoed back on success
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerificationQuery {
    /// The challenge to echo when the handshake matches `expected_token`
    #[must_use]
    pub fn accepted_challenge(&self, expected_token: &str) -> Option<&str> {
        let mode_ok = self.mode.as_deref() == Some(SUBSCRIBE_MODE);
        let token_ok = self.verify_token.as_deref().is_some_and(|token| {
            subtle::ConstantTimeEq::ct_eq(token.as_bytes(), expected_token.as_bytes()).into()
        });
        if mode_ok && token_ok {
            self.challenge.as_deref()
        } else {
            None
        }
    }
}

/// Event delivered by Strava
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// `activity` or `athlete`
    pub object_type: String,
    /// `create`, `update`, or `delete`
    pub aspect_type: String,
    /// Activity or athlete ID
    pub object_id: u64,
    /// Athlete who owns the object
    #[serde(default)]
    pub owner_id: Option<u64>,
    /// Unix timestamp of the event
    #[serde(default)]
    pub event_time: Option<i64>,
    /// Subscription that delivered the event
    #[serde(default)]
    pub subscription_id: Option<u64>,
}

impl WebhookEvent {
    /// Whether the event should trigger ingestion
    #[must_use]
    pub fn is_activity_create(&self) -> bool {
        self.object_type == "activity" && self.aspect_type == "create"
    }
}

/// Persisted webhook secrets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Verify token for the subscription handshake
    pub verify_token: String,
    /// HMAC key for signed deliveries
    pub signing_secret: Option<String>,
    /// When the config was first created
    pub created_at: DateTime<Utc>,
}

impl WebhookConfig {
    /// Load the stored config, apply environment overrides, and generate missing values
    ///
    /// The result is written back whenever it differs from what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn resolve(
        repository: &StateRepository,
        seed: &WebhookSeedConfig,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let stored = repository.load_webhook_config().await?;

        let verify_token = seed
            .verify_token
            .clone()
            .or_else(|| stored.as_ref().map(|c| c.verify_token.clone()))
            .unwrap_or_else(generate_secret);
        let signing_secret = seed
            .signing_secret
            .clone()
            .or_else(|| stored.as_ref().and_then(|c| c.signing_secret.clone()))
            .or_else(|| Some(generate_secret()));

        let config = Self {
            verify_token,
            signing_secret,
            created_at: stored.as_ref().map_or(now, |c| c.created_at),
        };

        if stored.as_ref() != Some(&config) {
            repository.save_webhook_config(&config).await?;
            info!("Stored webhook configuration");
        }
        Ok(config)
    }
}

/// Random hex secret
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
