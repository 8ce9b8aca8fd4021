// ABOUTME: Re-exports command modules for streak-cli
// ABOUTME: State inspection and correction plus webhook subscription management
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod state;
pub mod subscriptions;
