// ABOUTME: Persistent state store abstraction with pluggable backends
// ABOUTME: Key/value trait over JSON strings with in-memory, Redis, and fallback implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # State Store
//!
//! The service keeps four small JSON records. Backends only move strings;
//! typed access goes through [`repository::StateRepository`].

/// Backend selection from configuration
pub mod factory;
/// Redis-first store that degrades to memory
pub mod fallback;
/// In-process store
pub mod memory;
/// Redis store
pub mod redis;
/// Typed access to the persisted records
pub mod repository;

use crate::errors::AppResult;
use std::sync::Arc;

pub use fallback::FallbackStore;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;
pub use repository::StateRepository;

/// Key/value store for JSON documents
///
/// Implementations must be safe to share across tasks. The trait is object
/// safe so the server can pick a backend at startup and hold it as
/// `Arc<dyn StateStore>`.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    /// Remove a value; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Whether a key holds a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// All keys starting with `prefix`, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error describing why the backend is unhealthy
    async fn health_check(&self) -> AppResult<()>;

    /// Backend name for health reports and logs
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to the configured store
pub type SharedStore = Arc<dyn StateStore>;
