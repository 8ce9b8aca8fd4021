// ABOUTME: OAuth2 client module for Strava authentication
// ABOUTME: Token exchange client and the store-backed token manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Authorization URL, code exchange, and refresh
pub mod client;
/// Stored token lifecycle with single-flight refresh
pub mod token_manager;

pub use client::{AthleteSummary, OAuth2Client, OAuth2Config, OAuth2Token, TokenEndpoint};
pub use token_manager::{AccessTokenSource, TokenManager};
