// ABOUTME: Renders streak and stats state into the generated activity description block
// ABOUTME: Strips previously generated lines and keeps user-authored text after the block
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::fields::METERS_PER_KM;
use crate::models::{StatsState, StreakState};
use std::fmt::Write as _;

/// Number of segments in a progress bar
pub const PROGRESS_SEGMENTS: usize = 10;

/// Filled segment for the monthly bar
pub const MONTHLY_FILLED: char = '🟩';
/// Filled segment for the yearly bar
pub const YEARLY_FILLED: char = '🟦';
/// Empty segment for both bars
pub const EMPTY_SEGMENT: char = '⬜';
/// Appended to a period line once its goal is reached
pub const CELEBRATION: &str = "🎉";

const STREAK_MARKER: &str = "Streak: Day";
const TOTALS_MARKER: &str = "📊 Total:";
const MONTHLY_MARKER: &str = "Monthly:";
const YEARLY_MARKER: &str = "Yearly:";
const SIGNATURE_MARKER: &str = "Tracked by run-streak";

/// Builds the generated description block
pub struct DescriptionFormatter;

impl DescriptionFormatter {
    /// Render the generated block followed by any user-authored text
    #[must_use]
    pub fn render(
        streak: &StreakState,
        stats: &StatsState,
        previous_description: Option<&str>,
    ) -> String {
        let block = Self::generated_block(streak, stats);
        let user_text = previous_description.map(Self::strip_generated).unwrap_or_default();

        if user_text.is_empty() {
            block
        } else {
            format!("{block}\n\n{user_text}")
        }
    }

    /// Remove generated lines and blank lines from a description
    #[must_use]
    pub fn strip_generated(text: &str) -> String {
        text.lines()
            .filter(|line| !line.trim().is_empty() && !Self::is_generated_line(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_owned()
    }

    fn is_generated_line(line: &str) -> bool {
        [
            STREAK_MARKER,
            TOTALS_MARKER,
            MONTHLY_MARKER,
            YEARLY_MARKER,
            SIGNATURE_MARKER,
        ]
        .iter()
        .any(|marker| line.contains(marker))
            || line.contains(MONTHLY_FILLED)
            || line.contains(YEARLY_FILLED)
            || line.contains(EMPTY_SEGMENT)
    }

    fn generated_block(streak: &StreakState, stats: &StatsState) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "🏃 {STREAK_MARKER} {} (best {})",
            streak.current_streak, streak.longest_streak
        );
        let _ = writeln!(
            out,
            "{TOTALS_MARKER} {} km | {} | {} m ↑ | {} runs",
            format_km(streak.total_distance_meters),
            format_duration(streak.total_time_seconds),
            format_elevation(streak.total_elevation_meters),
            streak.total_runs
        );

        let monthly_pct = stats.monthly_percent();
        let _ = writeln!(
            out,
            "📅 {MONTHLY_MARKER} {}",
            period_summary(stats.monthly_distance_meters, stats.monthly_goal_meters, monthly_pct)
        );
        let _ = writeln!(out, "{}", progress_bar(monthly_pct, MONTHLY_FILLED));

        let yearly_pct = stats.yearly_percent();
        let _ = writeln!(
            out,
            "📆 {YEARLY_MARKER} {}",
            period_summary(stats.yearly_distance_meters, stats.yearly_goal_meters, yearly_pct)
        );
        let _ = writeln!(out, "{}", progress_bar(yearly_pct, YEARLY_FILLED));

        out.push_str("🔗 ");
        out.push_str(SIGNATURE_MARKER);
        out
    }
}

fn period_summary(distance_meters: f64, goal_meters: f64, percent: f64) -> String {
    let mut line = format!(
        "{} / {:.0} km ({:.0}%)",
        format_km(distance_meters),
        goal_meters / METERS_PER_KM,
        percent.floor()
    );
    if percent >= 100.0 {
        line.push(' ');
        line.push_str(CELEBRATION);
    }
    line
}

/// Kilometers with one decimal
#[must_use]
pub fn format_km(meters: f64) -> String {
    format!("{:.1}", meters / METERS_PER_KM)
}

/// Seconds as `"{h}h {m}m"`, truncating leftover seconds
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Elevation rounded to whole meters
#[must_use]
pub fn format_elevation(meters: f64) -> String {
    format!("{:.0}", meters.round())
}

/// Ten-segment bar with `floor(min(percent / 100, 1) * 10)` filled segments
#[must_use]
pub fn progress_bar(percent: f64, filled_glyph: char) -> String {
    let ratio = if percent.is_finite() {
        (percent / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((ratio * PROGRESS_SEGMENTS as f64).floor() as usize).min(PROGRESS_SEGMENTS);

    let mut bar = String::with_capacity(PROGRESS_SEGMENTS * 4);
    bar.extend(std::iter::repeat(filled_glyph).take(filled));
    bar.extend(std::iter::repeat(EMPTY_SEGMENT).take(PROGRESS_SEGMENTS - filled));
    bar
}
