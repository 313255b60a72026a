use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Docmirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// What to crawl and how change detection behaves
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URL the breadth-first traversal starts from (depth 0)
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum depth to crawl from the start URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of URLs ever enqueued in one run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Directory the artifacts are written to
    #[serde(rename = "output-directory")]
    pub output_directory: PathBuf,

    /// Re-save every page even when its content hash is unchanged
    #[serde(rename = "force-recrawl", default)]
    pub force_recrawl: bool,

    /// When disabled every fetched page is saved
    #[serde(rename = "change-detection", default = "default_true")]
    pub change_detection: bool,

    /// URL prefixes a link must start with to be followed.
    /// Empty means "the start URL".
    #[serde(rename = "allowed-prefixes", default)]
    pub allowed_prefixes: Vec<String>,

    /// Follow links found on pages whose content did not change
    #[serde(rename = "expand-unchanged", default)]
    pub expand_unchanged: bool,

    /// What to do with a checkpoint left behind by an interrupted run
    #[serde(rename = "session-policy", default)]
    pub session_policy: SessionPolicy,
}

/// Handling of a saved session found at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPolicy {
    /// Resume a matching session, refuse to run on a conflicting one
    #[default]
    Auto,
    /// Discard any saved session and start over
    Fresh,
}

/// Worker pool and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between two dispatched fetches (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Minimum time between two automatic checkpoints (seconds)
    #[serde(
        rename = "checkpoint-interval-secs",
        default = "default_checkpoint_interval_secs"
    )]
    pub checkpoint_interval_secs: u64,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

/// Locations of the metadata and session files
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Relative paths resolve inside the output directory
    #[serde(rename = "metadata-file", default = "default_metadata_file")]
    pub metadata_file: PathBuf,

    /// Relative paths resolve inside the output directory
    #[serde(rename = "session-file", default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Config {
    /// Builds a configuration with default settings for everything but the
    /// start URL and the output directory
    pub fn new(start_url: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            crawl: CrawlConfig {
                start_url: start_url.into(),
                max_depth: default_max_depth(),
                max_pages: default_max_pages(),
                output_directory: output_directory.into(),
                force_recrawl: false,
                change_detection: true,
                allowed_prefixes: Vec::new(),
                expand_unchanged: false,
                session_policy: SessionPolicy::Auto,
            },
            runtime: RuntimeConfig::default(),
            user_agent: UserAgentConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Path of the metadata file
    pub fn metadata_path(&self) -> PathBuf {
        resolve(&self.crawl.output_directory, &self.storage.metadata_file)
    }

    /// Path of the session recovery file
    pub fn session_path(&self) -> PathBuf {
        resolve(&self.crawl.output_directory, &self.storage.session_file)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.runtime.politeness_delay_ms)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.runtime.checkpoint_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.request_timeout_secs)
    }
}

fn resolve(base: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            politeness_delay_ms: default_politeness_delay_ms(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_file: default_metadata_file(),
            session_file: default_session_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> u32 {
    15
}

fn default_max_pages() -> usize {
    150_000
}

fn default_concurrency() -> usize {
    4
}

fn default_politeness_delay_ms() -> u64 {
    250
}

fn default_checkpoint_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_crawler_name() -> String {
    "docmirror".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("metadata.json")
}

fn default_session_file() -> PathBuf {
    PathBuf::from("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_storage_paths_resolve_in_output_directory() {
        let config = Config::new("https://docs.example.com/", "/tmp/mirror");
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/tmp/mirror/metadata.json")
        );
        assert_eq!(
            config.session_path(),
            PathBuf::from("/tmp/mirror/session.json")
        );
    }

    #[test]
    fn test_absolute_storage_paths_are_kept() {
        let mut config = Config::new("https://docs.example.com/", "/tmp/mirror");
        config.storage.metadata_file = PathBuf::from("/var/lib/docmirror/meta.json");
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/var/lib/docmirror/meta.json")
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("https://docs.example.com/", "./out");
        assert!(config.crawl.change_detection);
        assert!(!config.crawl.force_recrawl);
        assert_eq!(config.crawl.session_policy, SessionPolicy::Auto);
        assert_eq!(config.runtime.concurrency, 4);
        assert_eq!(config.checkpoint_interval(), Duration::from_secs(30));
        assert_eq!(config.politeness_delay(), Duration::from_millis(250));
    }
}
