// ABOUTME: Core streak and statistics engine for the run-streak tracker
// ABOUTME: Pure state-update rules with no network or storage dependencies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Streak Core
//!
//! Everything that decides how persisted running state changes lives here:
//!
//! - **dates**: calendar comparisons and the `Clock` abstraction
//! - **models**: `Activity`, `StreakState`, `StatsState`, the dedup watermark
//! - **streak**: consecutive-day streak and lifetime totals
//! - **stats**: monthly/yearly rollups against goals with lazy rollover
//! - **fields**: allow-list coercion tables for operator edits
//! - **description**: rendering of the generated activity description block
//!
//! The crate performs no I/O. Callers load state, run it through the engines
//! and persist the result.

/// Calendar helpers and the `Clock` abstraction
pub mod dates;

/// Operator edit coercion tables
pub mod fields;

/// Generated description block rendering and stripping
pub mod description;

/// Persisted state and activity input types
pub mod models;

/// Monthly and yearly rollups
pub mod stats;

/// Consecutive-day streak and lifetime totals
pub mod streak;

pub use dates::{Clock, FixedClock, SystemClock};
pub use description::DescriptionFormatter;
pub use fields::{FieldError, ManualEditReport};
pub use models::{
    Activity, LastProcessedActivity, QualifyingRule, StatsState, StreakRecord, StreakState,
};
pub use stats::StatsEngine;
pub use streak::{RunOutcome, StreakEngine};
