//! Content transformation: HTML to normalized text plus outbound links
//!
//! The coordinator only needs two things from a fetched page: the text that
//! gets hashed and saved, and the links that extend the frontier. The
//! `Transformer` trait is that seam; `HtmlTransformer` is the default.

use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text never ends up in an artifact
const IGNORED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Normalized content of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedPage {
    /// The page title (from the <title> tag)
    pub title: Option<String>,

    /// Normalized text, saved as the artifact and hashed
    pub text: String,

    /// Outbound links, absolute and normalized, in document order
    pub links: Vec<String>,
}

/// Turns raw fetched bytes into normalized text and links
///
/// Returns `None` when the bytes hold nothing worth saving; the coordinator
/// counts that as a failed page.
pub trait Transformer: Send + Sync {
    fn transform(&self, raw: &[u8], url: &Url) -> Option<TransformedPage>;
}

/// Default transformer for HTML documentation pages
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - fragment-only links
///
/// Text is taken from `<main>` when present, otherwise from `<body>`, with
/// whitespace collapsed and script/style content dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTransformer;

impl Transformer for HtmlTransformer {
    fn transform(&self, raw: &[u8], url: &Url) -> Option<TransformedPage> {
        let html = String::from_utf8_lossy(raw);
        let page = parse_html(&html, url);

        if page.text.is_empty() && page.title.is_none() {
            return None;
        }

        Some(page)
    }
}

/// Parses HTML content and extracts title, text and links
///
/// # Example
///
/// ```
/// use docmirror::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> TransformedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let body = extract_text(&document);
    let links = extract_links(&document, base_url);

    let text = match (&title, body.is_empty()) {
        (Some(title), false) => format!("# {}\n\n{}\n", title, body),
        (Some(title), true) => format!("# {}\n", title),
        (None, false) => format!("{}\n", body),
        (None, true) => String::new(),
    };

    TransformedPage { title, text, links }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts readable text, one line per text node
fn extract_text(document: &Html) -> String {
    let root = ["main", "body"]
        .iter()
        .filter_map(|name| Selector::parse(name).ok())
        .find_map(|selector| document.select(&selector).next());

    match root {
        Some(element) => collect_text(element),
        None => String::new(),
    }
}

fn collect_text(element: ElementRef) -> String {
    let mut lines = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let ignored = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| IGNORED_TAGS.contains(&e.name()))
                .unwrap_or(false)
        });
        if ignored {
            continue;
        }

        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Extracts all valid links from the HTML document, without duplicates
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, base_url) {
            let absolute = absolute.to_string();
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test   Page  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_text_prefers_main() {
        let html = r#"<html><head><title>T</title></head><body>
            <nav>Navigation</nav>
            <main><h1>Heading</h1><p>Some   body
            text</p></main>
        </body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.text, "# T\n\nHeading\nSome body text\n");
    }

    #[test]
    fn test_text_skips_scripts_and_styles() {
        let html = r#"<html><body><p>Visible</p><script>var hidden = 1;</script>
            <style>.x { color: red }</style></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.text, "Visible\n");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/other".to_string()]);
    }

    #[test]
    fn test_links_are_normalized_and_deduplicated() {
        let html = r#"<html><body>
            <a href="/other/">One</a>
            <a href="/other#section">Two</a>
            <a href="https://EXAMPLE.com/other">Three</a>
        </body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/other".to_string()]);
    }

    #[test]
    fn test_skip_non_document_links() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+1234567890">Call</a>
            <a href="data:text/html,<h1>Test</h1>">Data</a>
            <a href="#section">Jump</a>
            <a href="/file.pdf" download>Download</a>
        </body></html>"##;
        let parsed = parse_html(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert!(parsed
            .links
            .contains(&"https://example.com/canonical".to_string()));
    }

    #[test]
    fn test_transformer_rejects_empty_documents() {
        let transformer = HtmlTransformer;
        assert!(transformer.transform(b"", &base_url()).is_none());
        assert!(transformer
            .transform(b"<html><body>   </body></html>", &base_url())
            .is_none());
    }

    #[test]
    fn test_transformer_accepts_lossy_utf8() {
        let transformer = HtmlTransformer;
        let raw = b"<html><body><p>caf\xe9</p></body></html>";
        let page = transformer.transform(raw, &base_url()).unwrap();
        assert!(page.text.starts_with("caf"));
    }
}
