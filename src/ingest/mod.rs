// ABOUTME: Activity ingestion pipeline from webhook or poll to persisted state and description
// ABOUTME: Serialized read-modify-write of streak state, operator edits, and the background poller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Operator edits and resets under the ingestion lock
pub mod edits;
/// Per-activity ingestion
pub mod ingestor;
/// Interval polling for activities missed by the webhook
pub mod poller;

pub use edits::{EditResult, StateSnapshot};
pub use ingestor::{ActivityIngestor, IngestError, IngestOutcome, IngestStage};
pub use poller::{PollSummary, Poller};
