// ABOUTME: Streak CLI - operator tool for inspecting and correcting streak state
// ABOUTME: Status, resets, manual edits, on-demand processing, polling, and webhook subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Show the current streak, rollups, and watermark
//! streak-cli status
//!
//! # Correct the streak after a missed upload
//! streak-cli edit streak --set currentStreak=42 --set lastRunDate=2025-03-09
//!
//! # Return the streak to automatic mode from zero
//! streak-cli reset streak
//!
//! # Process one activity now
//! streak-cli process 1234567890
//!
//! # Register the webhook callback with Strava
//! streak-cli subscriptions create
//! ```
//!
//! The CLI reads the same environment as the server and talks to the same
//! state store directly.

mod commands;
mod helpers;

use clap::{Parser, Subcommand, ValueEnum};
use run_streak::{
    config::ServerConfig, errors::AppResult, resources::ServerResources, store::factory,
};
use std::sync::Arc;
use streak_core::SystemClock;
use tracing::debug;

type Result<T> = AppResult<T>;

#[derive(Parser)]
#[command(
    name = "streak-cli",
    about = "Run streak management CLI",
    long_about = "Operator tool for inspecting and correcting the persisted running streak."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Redis URL override
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Show streak, rollups, and the last processed activity
    Status,

    /// Reset streak or rollups
    Reset {
        /// What to reset
        target: ResetTarget,
    },

    /// Overwrite fields and switch to manual mode
    Edit {
        /// Which record to edit
        target: EditTarget,

        /// Field assignment as key=value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        assignments: Vec<String>,
    },

    /// Fetch and ingest one activity
    Process {
        /// Strava activity ID
        activity_id: u64,
    },

    /// Ingest activities newer than the watermark
    Poll,

    /// Strava push subscription management
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ResetTarget {
    /// Streak counters and lifetime totals
    Streak,
    /// Monthly rollup
    Monthly,
    /// Yearly rollup
    Yearly,
}

#[derive(Clone, Copy, ValueEnum)]
enum EditTarget {
    /// Streak counters and lifetime totals
    Streak,
    /// Monthly and yearly rollups
    Stats,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum SubscriptionCommand {
    /// Register a callback URL (defaults to BASE_URL/webhook)
    Create {
        /// Callback URL override
        #[arg(long)]
        callback_url: Option<String>,
    },
    /// List registered subscriptions
    List,
    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut config = ServerConfig::from_env()?;
    if let Some(redis_url) = cli.redis_url {
        config.store.redis_url = Some(redis_url);
    }

    let store = factory::connect(&config.store).await;
    debug!(backend = store.backend_name(), "Connected to state store");
    let resources = ServerResources::build(config, store, Arc::new(SystemClock)).await?;

    match cli.command {
        Command::Status => commands::state::status(&resources).await,
        Command::Reset { target } => match target {
            ResetTarget::Streak => commands::state::reset_streak(&resources).await,
            ResetTarget::Monthly => commands::state::reset_monthly(&resources).await,
            ResetTarget::Yearly => commands::state::reset_yearly(&resources).await,
        },
        Command::Edit {
            target,
            assignments,
        } => {
            let form = commands::state::parse_assignments(&assignments)?;
            match target {
                EditTarget::Streak => commands::state::edit_streak(&resources, &form).await,
                EditTarget::Stats => commands::state::edit_stats(&resources, &form).await,
            }
        }
        Command::Process { activity_id } => {
            commands::state::process(&resources, activity_id).await
        }
        Command::Poll => commands::state::poll(&resources).await,
        Command::Subscriptions { action } => match action {
            SubscriptionCommand::Create { callback_url } => {
                commands::subscriptions::create(&resources, callback_url).await
            }
            SubscriptionCommand::List => commands::subscriptions::list(&resources).await,
            SubscriptionCommand::Delete { id } => {
                commands::subscriptions::delete(&resources, id).await
            }
        },
    }
}
