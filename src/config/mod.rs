// ABOUTME: Configuration management module for server settings
// ABOUTME: Environment-driven configuration for HTTP, storage, Strava, webhook, polling, and goals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All settings come from environment variables; see [`environment::ServerConfig::from_env`].

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AdminConfig, Environment, PollingConfig, RedisConnectionConfig, ServerConfig, StoreConfig,
    StravaApiConfig, StreakSettings, WebhookSeedConfig,
};
