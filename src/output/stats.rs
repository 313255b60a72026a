//! Run statistics for the terminal
//!
//! This module formats the counters of a crawl run for humans.

use crate::storage::CrawlStatistics;
use chrono::{DateTime, Utc};

/// Formats the time between `start` and `end` as `1h 02m 03s`
///
/// Leading zero units are dropped; a negative span formats as `0s`.
pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let total = (end - start).num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Share of processed pages that were written (new or updated), in percent
pub fn change_rate(stats: &CrawlStatistics) -> f64 {
    if stats.total_pages == 0 {
        return 0.0;
    }
    stats.changed_pages() as f64 / stats.total_pages as f64 * 100.0
}

/// Renders the statistics block printed after a run
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::from("=== Crawl Statistics ===\n\n");

    out.push_str(&format!("  Total pages:   {}\n", stats.total_pages));
    out.push_str(&format!("  New pages:     {}\n", stats.new_pages));
    out.push_str(&format!("  Updated pages: {}\n", stats.updated_pages));
    out.push_str(&format!("  Skipped pages: {}\n", stats.skipped_pages));
    out.push_str(&format!("  Errors:        {}\n", stats.errors));
    out.push('\n');

    match (stats.start_time, stats.end_time) {
        (Some(start), Some(end)) => {
            out.push_str(&format!("Duration: {}\n", format_duration(start, end)));
        }
        (Some(start), None) => {
            out.push_str(&format!(
                "Run in progress (started {})\n",
                start.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        _ => {}
    }

    out.push_str(&format!(
        "Change Rate: {:.1}% ({} / {} pages written)\n",
        change_rate(stats),
        stats.changed_pages(),
        stats.total_pages
    ));

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
