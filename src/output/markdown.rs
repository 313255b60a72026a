//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of the mirror:
//! the last run's statistics, pages per framework and pages per depth.

use crate::output::stats::{change_rate, format_duration};
use crate::output::OutputResult;
use crate::storage::{pages_by_framework, CrawlMetadata};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary from crawl metadata
///
/// # Arguments
///
/// * `metadata` - The mirror's metadata
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    metadata: &CrawlMetadata,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(metadata);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats crawl metadata as markdown
pub fn format_markdown_summary(metadata: &CrawlMetadata) -> String {
    let mut md = String::new();
    let stats = &metadata.stats;

    md.push_str("# Documentation Mirror Summary\n\n");

    md.push_str("## Last Crawl\n\n");
    match metadata.last_crawl {
        Some(last) => md.push_str(&format!(
            "- **Completed**: {}\n",
            last.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => md.push_str("- **Completed**: never\n"),
    }
    if let Some(start) = stats.start_time {
        md.push_str(&format!(
            "- **Started**: {}\n",
            start.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    match (stats.start_time, stats.end_time) {
        (Some(start), Some(end)) => {
            md.push_str(&format!("- **Duration**: {}\n", format_duration(start, end)));
            md.push_str("- **Status**: completed\n\n");
        }
        (Some(_), None) => md.push_str("- **Status**: interrupted\n\n"),
        _ => md.push('\n'),
    }

    md.push_str("## Run Statistics\n\n");
    md.push_str("| Outcome | Pages |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| New | {} |\n", stats.new_pages));
    md.push_str(&format!("| Updated | {} |\n", stats.updated_pages));
    md.push_str(&format!("| Skipped | {} |\n", stats.skipped_pages));
    md.push_str(&format!("| Errors | {} |\n", stats.errors));
    md.push_str(&format!("| **Total** | {} |\n\n", stats.total_pages));
    md.push_str(&format!("- **Change Rate**: {:.2}%\n", change_rate(stats)));
    md.push_str(&format!("- **Pages in Mirror**: {}\n\n", metadata.pages.len()));

    let frameworks = pages_by_framework(metadata);
    if !frameworks.is_empty() {
        md.push_str("## Pages by Framework\n\n");
        md.push_str("| Framework | Pages |\n");
        md.push_str("|-----------|-------|\n");

        let mut rows: Vec<_> = frameworks.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (framework, count) in rows {
            md.push_str(&format!("| {} | {} |\n", framework, count));
        }
        md.push('\n');
    }

    let mut depths: BTreeMap<u32, usize> = BTreeMap::new();
    for page in metadata.pages.values() {
        *depths.entry(page.depth).or_insert(0) += 1;
    }
    if !depths.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    md
}
