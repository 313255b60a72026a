//! URL handling module for Docmirror
//!
//! This module provides URL normalization, allow-list matching, framework
//! tagging and the mapping from page URLs to artifact paths.

mod matcher;
mod normalize;

use crate::config::Config;
use crate::UrlResult;
use std::path::{Path, PathBuf};
use url::Url;

// Re-export main functions
pub use matcher::{matches_any_prefix, matches_prefix};
pub use normalize::{normalize_url, resolve_link};

/// File extension of saved artifacts
pub const ARTIFACT_EXTENSION: &str = "md";

/// Framework tag for the start page itself and for paths without segments
pub const INDEX_FRAMEWORK: &str = "index";

/// Returns the normalized allow-list for a configuration
///
/// When no prefixes are configured the start URL is the only prefix, so the
/// crawl stays inside the tree it was pointed at.
pub fn allowed_prefixes(config: &Config) -> UrlResult<Vec<String>> {
    if config.crawl.allowed_prefixes.is_empty() {
        return Ok(vec![normalize_url(&config.crawl.start_url)?.to_string()]);
    }

    config
        .crawl
        .allowed_prefixes
        .iter()
        .map(|prefix| normalize_url(prefix).map(|url| url.to_string()))
        .collect()
}

/// Derives the framework tag of a page
///
/// The tag is the first path segment below the crawl root, lowercased.
/// Pages outside the root use their first path segment instead.
///
/// # Examples
///
/// ```
/// use docmirror::url::framework_for;
/// use url::Url;
///
/// let root = Url::parse("https://docs.example.com/documentation").unwrap();
/// let page = Url::parse("https://docs.example.com/documentation/SwiftUI/View").unwrap();
/// assert_eq!(framework_for(&page, &root), "swiftui");
/// assert_eq!(framework_for(&root, &root), "index");
/// ```
pub fn framework_for(url: &Url, root: &Url) -> String {
    let page_segments = path_segments(url);
    let root_segments = path_segments(root);

    let below_root = url.host_str() == root.host_str()
        && page_segments.len() >= root_segments.len()
        && page_segments[..root_segments.len()] == root_segments[..];

    let candidate = if below_root {
        page_segments.get(root_segments.len())
    } else {
        page_segments.first()
    };

    candidate
        .map(|segment| segment.to_lowercase())
        .unwrap_or_else(|| INDEX_FRAMEWORK.to_string())
}

/// Maps a page URL to the location of its artifact under `output_dir`
///
/// Layout: `<output_dir>/<host>/<path segments>.md`, with `index.md` for
/// the host root. Segment characters outside `[A-Za-z0-9._-]` become `_`,
/// and a query string becomes a sanitized suffix of the file name.
///
/// # Examples
///
/// ```
/// use docmirror::url::artifact_path;
/// use std::path::Path;
/// use url::Url;
///
/// let url = Url::parse("https://docs.example.com/documentation/swiftui/view").unwrap();
/// assert_eq!(
///     artifact_path(Path::new("/mirror"), &url),
///     Path::new("/mirror/docs.example.com/documentation/swiftui/view.md")
/// );
/// ```
pub fn artifact_path(output_dir: &Path, url: &Url) -> PathBuf {
    let mut path = output_dir.join(sanitize_segment(url.host_str().unwrap_or("unknown-host")));

    let segments = path_segments(url);
    let (dirs, file_stem) = match segments.split_last() {
        Some((last, dirs)) => (dirs, sanitize_segment(last)),
        None => (&[][..], INDEX_FRAMEWORK.to_string()),
    };

    for dir in dirs {
        path.push(sanitize_segment(dir));
    }

    let file_name = match url.query() {
        Some(query) => format!(
            "{}__{}.{}",
            file_stem,
            sanitize_segment(query),
            ARTIFACT_EXTENSION
        ),
        None => format!("{}.{}", file_stem, ARTIFACT_EXTENSION),
    };

    path.push(file_name);
    path
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn sanitize_segment(segment: &str) -> String {
    let sanitized: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Never produce names that the filesystem treats as navigation
    if sanitized.chars().all(|c| c == '.') {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}
