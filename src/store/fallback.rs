// ABOUTME: Store that writes through to Redis and memory and reads with fallback
// ABOUTME: Keeps the service running on memory while Redis is unreachable and logs each transition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{InMemoryStore, SharedStore, StateStore};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Durable primary store with an in-memory mirror
///
/// Every write lands in memory and, when possible, in the primary. Reads
/// prefer the primary and fall back to memory when it fails or has no value
/// for a key written during an outage. A primary failure is a degradation,
/// not an error: callers always get a result.
#[derive(Clone)]
pub struct FallbackStore {
    primary: Option<SharedStore>,
    memory: InMemoryStore,
    degraded: Arc<AtomicBool>,
}

impl FallbackStore {
    /// Wrap a primary store; `None` runs on memory alone in degraded mode
    #[must_use]
    pub fn new(primary: Option<SharedStore>) -> Self {
        let degraded = primary.is_none();
        Self {
            primary,
            memory: InMemoryStore::new(),
            degraded: Arc::new(AtomicBool::new(degraded)),
        }
    }

    /// Whether the last primary operation failed
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn primary_backend(&self) -> &'static str {
        self.primary.as_ref().map_or("none", |p| p.backend_name())
    }

    fn mark_failure(&self, op: &str, error: &AppError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            AppLogger::log_storage_transition(
                self.primary_backend(),
                true,
                &format!("{op}: {}", error.message),
            );
        }
    }

    async fn mark_success(&self) {
        // Leave degraded mode only once the primary holds the outage writes
        if self.is_degraded()
            && self.resync().await
            && self.degraded.swap(false, Ordering::SeqCst)
        {
            AppLogger::log_storage_transition(self.primary_backend(), false, "primary reachable");
        }
    }

    /// Probe the primary after an outage and resync before it is read again
    ///
    /// Returns whether the primary can serve reads. While degraded, memory
    /// holds the newest values, so a read must not reach the primary until
    /// they have been copied back.
    async fn ensure_primary_current(&self, primary: &SharedStore) -> bool {
        if !self.is_degraded() {
            return true;
        }
        match primary.health_check().await {
            Ok(()) => {
                self.mark_success().await;
                !self.is_degraded()
            }
            Err(_) => false,
        }
    }

    /// Copy values written during an outage back to the primary
    ///
    /// Returns whether every value was copied.
    async fn resync(&self) -> bool {
        let Some(primary) = &self.primary else {
            return false;
        };
        let Ok(keys) = self.memory.keys("").await else {
            return false;
        };
        for key in keys {
            if let Ok(Some(value)) = self.memory.get(&key).await {
                if let Err(e) = primary.set(&key, value).await {
                    self.mark_failure("resync", &e);
                    return false;
                }
            }
        }
        debug!("Resynced in-memory state to primary store");
        true
    }
}

#[async_trait::async_trait]
impl StateStore for FallbackStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        if let Some(primary) = &self.primary {
            if !self.ensure_primary_current(primary).await {
                return self.memory.get(key).await;
            }
            match primary.get(key).await {
                Ok(Some(value)) => {
                    self.mark_success().await;
                    self.memory.set(key, value.clone()).await?;
                    return Ok(Some(value));
                }
                Ok(None) => self.mark_success().await,
                Err(e) => self.mark_failure("get", &e),
            }
        }
        self.memory.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.memory.set(key, value.clone()).await?;
        if let Some(primary) = &self.primary {
            match primary.set(key, value).await {
                Ok(()) => self.mark_success().await,
                Err(e) => self.mark_failure("set", &e),
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.memory.delete(key).await?;
        if let Some(primary) = &self.primary {
            match primary.delete(key).await {
                Ok(()) => self.mark_success().await,
                Err(e) => self.mark_failure("delete", &e),
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        if let Some(primary) = &self.primary {
            if !self.ensure_primary_current(primary).await {
                return self.memory.exists(key).await;
            }
            match primary.exists(key).await {
                Ok(true) => {
                    self.mark_success().await;
                    return Ok(true);
                }
                Ok(false) => self.mark_success().await,
                Err(e) => self.mark_failure("exists", &e),
            }
        }
        self.memory.exists(key).await
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut keys = self.memory.keys(prefix).await?;
        if let Some(primary) = &self.primary {
            match primary.keys(prefix).await {
                Ok(primary_keys) => {
                    self.mark_success().await;
                    keys.extend(primary_keys);
                    keys.sort();
                    keys.dedup();
                }
                Err(e) => self.mark_failure("keys", &e),
            }
        }
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<()> {
        match &self.primary {
            Some(primary) => match primary.health_check().await {
                Ok(()) => {
                    self.mark_success().await;
                    Ok(())
                }
                Err(e) => {
                    self.mark_failure("health_check", &e);
                    Err(e)
                }
            },
            None => Err(AppError::storage(
                "No durable store connected; running on memory",
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        if self.primary.is_some() {
            "redis+memory"
        } else {
            "memory"
        }
    }
}
