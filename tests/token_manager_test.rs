// ABOUTME: Integration tests for stored-token lifecycle management
// ABOUTME: Verifies proactive refresh, single-flight refresh after 401, and missing tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{memory_repository, token, FakeTokenEndpoint};
use run_streak::errors::ErrorCode;
use run_streak::oauth2_client::{AccessTokenSource, TokenManager};
use run_streak::store::StateRepository;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use streak_core::SystemClock;

fn manager(repository: StateRepository, endpoint: Arc<FakeTokenEndpoint>) -> Arc<TokenManager> {
    Arc::new(TokenManager::new(repository, endpoint, Arc::new(SystemClock)))
}

#[tokio::test]
async fn test_valid_token_is_returned_without_refresh() -> Result<()> {
    let repo = memory_repository();
    repo.save_tokens(&token("access-0", 6)).await?;
    let endpoint = Arc::new(FakeTokenEndpoint::default());
    let tokens = manager(repo, endpoint.clone());

    assert_eq!(tokens.access_token().await?, "access-0");
    assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 0);
    assert!(tokens.is_connected().await?);
    Ok(())
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_proactively() -> Result<()> {
    let repo = memory_repository();
    // Expired an hour ago
    repo.save_tokens(&token("access-0", -1)).await?;
    let endpoint = Arc::new(FakeTokenEndpoint::default());
    let tokens = manager(repo.clone(), endpoint.clone());

    assert_eq!(tokens.access_token().await?, "access-1");
    assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);

    let stored = repo.load_tokens().await?.unwrap();
    assert_eq!(stored.access_token, "access-1");
    // The refresh response carries no athlete; the stored one survives
    assert_eq!(stored.athlete_id, Some(42));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_unauthorized_callers_share_one_refresh() -> Result<()> {
    let repo = memory_repository();
    repo.save_tokens(&token("access-0", 6)).await?;
    let endpoint = Arc::new(FakeTokenEndpoint::default());
    let tokens = manager(repo, endpoint.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.refresh_after_unauthorized("access-0").await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await??, "access-1");
    }
    assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_with_fresh_token_still_refreshes() -> Result<()> {
    let repo = memory_repository();
    repo.save_tokens(&token("access-0", 6)).await?;
    let endpoint = Arc::new(FakeTokenEndpoint::default());
    let tokens = manager(repo, endpoint.clone());

    // The API revoked a token that had hours left
    assert_eq!(tokens.refresh_after_unauthorized("access-0").await?, "access-1");
    assert_eq!(tokens.refresh_after_unauthorized("access-1").await?, "access-2");
    assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_tokens_is_auth_failure() -> Result<()> {
    let tokens = manager(memory_repository(), Arc::new(FakeTokenEndpoint::default()));

    let err = tokens.access_token().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert!(!tokens.is_connected().await?);
    Ok(())
}

#[tokio::test]
async fn test_rejected_refresh_propagates() -> Result<()> {
    let repo = memory_repository();
    repo.save_tokens(&token("access-0", -1)).await?;
    let endpoint = Arc::new(FakeTokenEndpoint::default());
    endpoint.reject.store(true, Ordering::SeqCst);
    let tokens = manager(repo.clone(), endpoint);

    let err = tokens.access_token().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert_eq!(repo.load_tokens().await?.unwrap().access_token, "access-0");
    Ok(())
}
