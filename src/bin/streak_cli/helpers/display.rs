// ABOUTME: Output formatting helpers for streak-cli
// ABOUTME: Prints streak records, watermarks, and manual edit reports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use streak_core::description::{format_duration, format_elevation, format_km};
use streak_core::{LastProcessedActivity, ManualEditReport, StreakRecord};

/// Print streak and stats
pub fn display_record(record: &StreakRecord) {
    let streak = &record.streak;
    let stats = &record.stats;

    println!("{}", "=".repeat(60));
    println!("STREAK{}", if streak.manually_updated { " (manual)" } else { "" });
    println!("   Current:   {} days", streak.current_streak);
    println!("   Longest:   {} days", streak.longest_streak);
    println!(
        "   Started:   {}",
        streak
            .streak_start_date
            .map_or_else(|| "-".to_owned(), |d| d.to_string())
    );
    println!(
        "   Last run:  {}",
        streak
            .last_run_date
            .map_or_else(|| "-".to_owned(), |d| d.to_string())
    );
    println!(
        "   Totals:    {} runs, {} km, {}, {} m",
        streak.total_runs,
        format_km(streak.total_distance_meters),
        format_duration(streak.total_time_seconds),
        format_elevation(streak.total_elevation_meters)
    );

    println!("STATS{}", if stats.manually_updated { " (manual)" } else { "" });
    println!(
        "   Month:     {} / {} km ({:.1}%)",
        format_km(stats.monthly_distance_meters),
        format_km(stats.monthly_goal_meters),
        stats.monthly_percent()
    );
    println!(
        "   Year:      {} / {} km ({:.1}%)",
        format_km(stats.yearly_distance_meters),
        format_km(stats.yearly_goal_meters),
        stats.yearly_percent()
    );
    println!("{}", "=".repeat(60));
}

/// Print the dedup watermark
pub fn display_watermark(watermark: Option<&LastProcessedActivity>) {
    match watermark {
        Some(mark) => println!(
            "Last processed: {} ({}, {} km) on {}",
            mark.id,
            mark.activity_type,
            format_km(mark.distance_meters),
            mark.day()
        ),
        None => println!("Last processed: none"),
    }
}

/// Print which form keys were applied, rejected, or ignored
pub fn display_edit_report(report: &ManualEditReport) {
    println!("Applied: {}", report.applied.join(", "));
    for (key, error) in &report.rejected {
        println!("Rejected {key}: {error}");
    }
    if !report.ignored.is_empty() {
        println!("Ignored: {}", report.ignored.join(", "));
    }
}
