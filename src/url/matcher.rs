/// Checks if a URL falls under an allow-list prefix
///
/// Matching respects path-segment boundaries:
/// 1. Exact match: the prefix URL itself
/// 2. Prefix ending in `/`: any URL starting with it
/// 3. Otherwise the next character after the prefix must start a new
///    path segment (`/`) or the query (`?`)
///
/// # Arguments
///
/// * `prefix` - The allow-list entry (a normalized URL string)
/// * `candidate` - The normalized URL to check
///
/// # Examples
///
/// ```
/// use docmirror::url::matches_prefix;
///
/// let prefix = "https://docs.example.com/documentation";
///
/// assert!(matches_prefix(prefix, "https://docs.example.com/documentation"));
/// assert!(matches_prefix(prefix, "https://docs.example.com/documentation/swiftui"));
/// assert!(!matches_prefix(prefix, "https://docs.example.com/documentation-archive"));
/// assert!(!matches_prefix(prefix, "https://docs.example.com/videos"));
/// ```
pub fn matches_prefix(prefix: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(prefix) {
        None => false,
        Some("") => true,
        Some(rest) => prefix.ends_with('/') || rest.starts_with('/') || rest.starts_with('?'),
    }
}

/// Checks a URL against a whole allow-list
///
/// An empty allow-list accepts nothing.
pub fn matches_any_prefix(prefixes: &[String], candidate: &str) -> bool {
    prefixes
        .iter()
        .any(|prefix| matches_prefix(prefix, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_prefix(
            "https://example.com/docs",
            "https://example.com/docs"
        ));
    }

    #[test]
    fn test_nested_paths_match() {
        let prefix = "https://example.com/docs";
        assert!(matches_prefix(prefix, "https://example.com/docs/a"));
        assert!(matches_prefix(prefix, "https://example.com/docs/a/b/c"));
        assert!(matches_prefix(prefix, "https://example.com/docs?lang=en"));
    }

    #[test]
    fn test_segment_boundary() {
        let prefix = "https://example.com/docs";
        assert!(!matches_prefix(prefix, "https://example.com/docsets"));
        assert!(!matches_prefix(prefix, "https://example.com/docs-old/page"));
    }

    #[test]
    fn test_root_prefix_matches_whole_host() {
        let prefix = "https://example.com/";
        assert!(matches_prefix(prefix, "https://example.com/"));
        assert!(matches_prefix(prefix, "https://example.com/anything/at/all"));
        assert!(!matches_prefix(prefix, "https://example.org/"));
    }

    #[test]
    fn test_other_host_or_scheme_rejected() {
        let prefix = "https://example.com/docs";
        assert!(!matches_prefix(prefix, "https://other.com/docs"));
        assert!(!matches_prefix(prefix, "http://example.com/docs"));
        assert!(!matches_prefix(prefix, "https://example.com.evil.org/docs"));
    }

    #[test]
    fn test_matches_any_prefix() {
        let prefixes = vec![
            "https://example.com/docs".to_string(),
            "https://example.com/tutorials".to_string(),
        ];
        assert!(matches_any_prefix(&prefixes, "https://example.com/docs/x"));
        assert!(matches_any_prefix(&prefixes, "https://example.com/tutorials/y"));
        assert!(!matches_any_prefix(&prefixes, "https://example.com/blog"));
        assert!(!matches_any_prefix(&[], "https://example.com/docs"));
    }
}
