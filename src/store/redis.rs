// ABOUTME: Redis state store with connection management and namespaced keys
// ABOUTME: Durable backend shared across restarts; keys listed with cursor-based SCAN
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::StateStore;
use crate::config::environment::RedisConnectionConfig;
use crate::constants::redis::SCAN_COUNT;
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis store
///
/// Uses `ConnectionManager` for automatic reconnection. Every key is
/// prefixed with the configured namespace so several deployments can share
/// one Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connect to Redis, retrying with exponential backoff
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or every connection attempt fails
    pub async fn connect(
        redis_url: &str,
        prefix: &str,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<Self> {
        info!(
            "Connecting to Redis (timeout={}s, response_timeout={}s, retries={})",
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::config(format!("Invalid REDIS_URL: {e}")))?;
        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!(prefix = %prefix, "Connected to Redis");
        Ok(Self {
            manager,
            prefix: prefix.to_owned(),
        })
    }

    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

fn command_error(op: &str, e: &redis::RedisError) -> AppError {
    error!("Redis {} failed: {}", op, e);
    AppError::storage(format!("Redis {op} failed: {e}"))
}

#[async_trait::async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(self.build_key(key))
            .await
            .map_err(|e| command_error("GET", &e))
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(self.build_key(key), value)
            .await
            .map_err(|e| command_error("SET", &e))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(self.build_key(key))
            .await
            .map_err(|e| command_error("DEL", &e))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        conn.exists(self.build_key(key))
            .await
            .map_err(|e| command_error("EXISTS", &e))
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let pattern = format!("{}*", self.build_key(prefix));
        let mut conn = self.manager.clone();
        let mut found = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| command_error("SCAN", &e))?;

            found.extend(batch.iter().map(|k| self.strip_prefix(k).to_owned()));

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("PING", &e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
