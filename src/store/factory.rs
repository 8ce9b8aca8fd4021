// ABOUTME: State store factory for environment-based backend selection
// ABOUTME: Picks memory or Redis-with-fallback from the store configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{FallbackStore, InMemoryStore, RedisStore, SharedStore};
use crate::config::environment::StoreConfig;
use crate::logging::AppLogger;
use std::sync::Arc;
use tracing::info;

/// Build the store described by `config`
///
/// Without `REDIS_URL` the store is memory only. With it, Redis is wrapped
/// in a [`FallbackStore`]; if Redis cannot be reached at startup the service
/// still starts, degraded to memory.
pub async fn connect(config: &StoreConfig) -> SharedStore {
    let Some(redis_url) = config.redis_url.as_deref() else {
        info!("No REDIS_URL configured; using in-memory state store");
        return Arc::new(InMemoryStore::new());
    };

    match RedisStore::connect(redis_url, &config.key_prefix, &config.redis_connection).await {
        Ok(redis) => Arc::new(FallbackStore::new(Some(Arc::new(redis)))),
        Err(e) => {
            AppLogger::log_storage_transition("redis", true, &e.message);
            Arc::new(FallbackStore::new(None))
        }
    }
}
