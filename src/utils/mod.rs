// ABOUTME: Utility modules shared across the service
// ABOUTME: Currently the outbound HTTP client factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Shared outbound HTTP clients
pub mod http_client;
