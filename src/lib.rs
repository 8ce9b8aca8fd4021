// ABOUTME: Main library entry point for the run streak service
// ABOUTME: Strava webhook ingestion, persisted streak and rollup state, and generated descriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Run Streak
//!
//! Tracks a consecutive-day running streak from Strava activities and writes
//! a generated summary into each new run's description.
//!
//! ## Architecture
//!
//! - **`streak_core`**: pure engines for streak, rollups, and description text
//! - **Store**: key/value state in Redis with an in-memory fallback
//! - **`OAuth2`**: Strava authorization code flow and token refresh
//! - **Providers**: Strava activity and push subscription clients
//! - **Ingest**: per-activity pipeline, operator edits, and the poller
//! - **Routes**: webhook, OAuth, health, and admin endpoints
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use run_streak::config::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("{}", config.summary());
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Application constants and environment lookups
pub mod constants;

/// Unified error handling
pub mod errors;

/// Activity ingestion, operator edits, and polling
pub mod ingest;

/// Structured logging setup and domain log helpers
pub mod logging;

/// Strava `OAuth2` client and token management
pub mod oauth2_client;

/// Strava API clients
pub mod providers;

/// Shared resources handed to route handlers
pub mod resources;

/// HTTP routes
pub mod routes;

/// Persistent key/value state
pub mod store;

/// Shared utilities
pub mod utils;

/// Webhook handshake, events, and signatures
pub mod webhook;
