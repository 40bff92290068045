//! Configuration for article-checker.
//!
//! Feed definitions and run settings come from `feeds.yaml`; credentials come
//! from the environment only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Endpoint and transport constants.
pub mod api {
    use std::time::Duration;

    /// Semantic Scholar Graph API endpoint.
    pub const GRAPH_API: &str = "https://api.semanticscholar.org/graph/v1";

    /// GitHub REST API root (gists live under `/gists`).
    pub const GITHUB_API: &str = "https://api.github.com";

    /// User agent sent with every request.
    pub const USER_AGENT: &str = concat!("ArticleChecker/", env!("CARGO_PKG_VERSION"));

    /// Timeout for a single metrics lookup.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for a single gist read or write.
    pub const GIST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for downloading a feed.
    pub const FEED_TIMEOUT: Duration = Duration::from_secs(30);

    /// Delay between consecutive metrics lookups (1 req/s without a key).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

    /// Delay between consecutive metrics lookups with an API key.
    pub const RATE_LIMIT_DELAY_WITH_KEY: Duration = Duration::from_millis(100);

    /// Wait assumed when a 429 carries no usable Retry-After.
    pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

    /// Default SMTP relay.
    pub const SMTP_SERVER: &str = "smtp.gmail.com";

    /// Default SMTP submission port (STARTTLS).
    pub const SMTP_PORT: u16 = 587;
}

/// Defaults for the `settings` block of `feeds.yaml`.
pub mod defaults {
    /// Days an author's metrics stay valid.
    pub const AUTHOR_CACHE_EXPIRY_DAYS: u32 = 180;

    /// Days a sent paper suppresses re-notification.
    pub const SENT_PAPERS_EXPIRY_DAYS: u32 = 30;

    /// Papers notified per run at most.
    pub const MAX_PAPERS_PER_RUN: usize = 50;

    /// Leading authors evaluated per paper.
    pub const MAX_AUTHORS_TO_EVALUATE: usize = 5;

    /// Base name of the author cache (`.json` locally, `.csv` in the gist).
    pub const AUTHOR_CACHE_NAME: &str = "author_cache";

    /// Base name of the sent-papers cache.
    pub const SENT_PAPERS_NAME: &str = "sent_papers";

    /// Feed configuration file inside the config directory.
    pub const FEEDS_FILE: &str = "feeds.yaml";
}

/// Field sets for metrics requests.
pub mod fields {
    /// Author fields needed for scoring.
    pub const AUTHOR_METRICS: &[&str] = &["hIndex", "citationCount", "paperCount", "url"];
}

/// Column schemas of the persisted caches. The first column is the natural key.
pub mod columns {
    /// Sent-papers table.
    pub const SENT_PAPERS: &[&str] =
        &["paper_id", "doi", "title", "source", "source_symbol", "sent_at", "citation_label"];

    /// Author cache table.
    pub const AUTHOR_CACHE: &[&str] =
        &["name", "h_index", "citation_count", "paper_count", "url", "cached_at"];
}

/// Run settings from the `settings` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Papers notified per run at most.
    pub max_papers_per_run: usize,

    /// Whether arXiv authors are looked up at all.
    pub evaluate_authors: bool,

    /// Leading authors evaluated per paper.
    pub max_authors_to_evaluate: usize,

    /// Author cache TTL in days.
    pub author_cache_expiry_days: u32,

    /// Sent-papers cache TTL in days.
    pub sent_papers_expiry_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_papers_per_run: defaults::MAX_PAPERS_PER_RUN,
            evaluate_authors: true,
            max_authors_to_evaluate: defaults::MAX_AUTHORS_TO_EVALUATE,
            author_cache_expiry_days: defaults::AUTHOR_CACHE_EXPIRY_DAYS,
            sent_papers_expiry_days: defaults::SENT_PAPERS_EXPIRY_DAYS,
        }
    }
}

/// Keyword filter applied to title + abstract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordFilter {
    /// Filter is skipped unless enabled.
    pub enabled: bool,

    /// At least one must appear (when non-empty).
    pub include: Vec<String>,

    /// None may appear.
    pub exclude: Vec<String>,
}

/// Per-feed filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedFilters {
    /// Keyword filter.
    pub keywords: KeywordFilter,
}

/// An arXiv category feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ArxivFeedConfig {
    /// RSS URL.
    pub url: String,

    /// Category label, e.g. `quant-ph`.
    #[serde(default = "unknown_category")]
    pub category: String,

    /// Short symbol for mail subjects; defaults to `arxiv/<category>`.
    #[serde(default)]
    pub symbol: Option<String>,

    /// Filters.
    #[serde(default)]
    pub filters: FeedFilters,
}

fn unknown_category() -> String {
    "unknown".to_string()
}

/// A journal feed (APS, Nature, Quantum, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct JournalFeedConfig {
    /// RSS URL.
    pub url: String,

    /// Journal display name.
    #[serde(default = "unknown_journal")]
    pub name: String,

    /// Short symbol for mail subjects; defaults to the name.
    #[serde(default)]
    pub symbol: Option<String>,

    /// Whether the journal is open access.
    #[serde(default)]
    pub open_access: bool,

    /// Filters.
    #[serde(default)]
    pub filters: FeedFilters,
}

fn unknown_journal() -> String {
    "Unknown Journal".to_string()
}

/// Contents of `feeds.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// arXiv feeds, fetched first.
    pub arxiv: Vec<ArxivFeedConfig>,

    /// Journal feeds.
    pub journals: Vec<JournalFeedConfig>,

    /// Run settings.
    pub settings: Settings,
}

impl FeedsConfig {
    /// Parse a feeds document.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse `feeds.yaml`.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (i, feed) in self.arxiv.iter().enumerate() {
            if feed.url.trim().is_empty() {
                return Err(ConfigError::invalid(format!("arxiv[{i}].url"), "must not be empty"));
            }
        }
        for (i, feed) in self.journals.iter().enumerate() {
            if feed.url.trim().is_empty() {
                return Err(ConfigError::invalid(format!("journals[{i}].url"), "must not be empty"));
            }
        }
        Ok(())
    }
}

/// Remote store credentials.
#[derive(Clone)]
pub struct GistConfig {
    /// Gist identifier.
    pub gist_id: String,

    /// Personal access token with gist scope.
    pub token: String,

    /// API root (overridden in tests).
    pub api_url: String,
}

impl GistConfig {
    /// Create a config against the public GitHub API.
    #[must_use]
    pub fn new(gist_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self { gist_id: gist_id.into(), token: token.into(), api_url: api::GITHUB_API.to_string() }
    }
}

impl std::fmt::Debug for GistConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistConfig").field("gist_id", &self.gist_id).finish()
    }
}

/// Metrics lookup configuration.
#[derive(Clone)]
pub struct ScholarConfig {
    /// Semantic Scholar API key (optional).
    pub api_key: Option<String>,

    /// Base URL for Graph API (for testing with mock servers).
    pub graph_api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay between consecutive lookups.
    pub rate_limit_delay: Duration,
}

impl ScholarConfig {
    /// Create a configuration with optional API key.
    ///
    /// The lookup delay shrinks when a key is present.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        let rate_limit_delay = if api_key.is_some() {
            api::RATE_LIMIT_DELAY_WITH_KEY
        } else {
            api::RATE_LIMIT_DELAY
        };
        Self {
            api_key,
            graph_api_url: api::GRAPH_API.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_delay,
        }
    }

    /// Create a test configuration against a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: None,
            graph_api_url: format!("{base_url}/graph/v1"),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0),
        }
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for ScholarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholarConfig")
            .field("graph_api_url", &self.graph_api_url)
            .field("has_api_key", &self.has_api_key())
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish()
    }
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// SMTP delivery configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    /// Relay host.
    pub server: String,

    /// Relay port.
    pub port: u16,

    /// Login user (also the sender).
    pub username: String,

    /// Login password (app password).
    pub password: String,

    /// Recipient address.
    pub to: String,
}

impl SmtpConfig {
    /// Sender and recipient are both set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.to.is_empty()
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("to", &self.to)
            .finish()
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feeds and settings.
    pub feeds: FeedsConfig,

    /// Directory for local cache files.
    pub cache_dir: PathBuf,

    /// Remote store; `None` selects local files.
    pub gist: Option<GistConfig>,

    /// Metrics lookup.
    pub scholar: ScholarConfig,

    /// Mail delivery.
    pub smtp: SmtpConfig,
}

impl Config {
    /// Load `feeds.yaml` from `config_dir` and credentials from the process environment.
    pub fn load(config_dir: &Path, cache_dir: &Path) -> ConfigResult<Self> {
        let feeds = FeedsConfig::from_file(&config_dir.join(defaults::FEEDS_FILE))?;
        Self::from_lookup(feeds, cache_dir, |name| std::env::var(name).ok())
    }

    /// Assemble a config with an explicit variable lookup.
    pub fn from_lookup(
        feeds: FeedsConfig,
        cache_dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gist = match (var("GIST_ID"), var("GH_GIST_TOKEN")) {
            (Some(id), Some(token)) => Some(GistConfig::new(id, token)),
            _ => None,
        };

        let port = match var("SMTP_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::invalid("SMTP_PORT", format!("'{raw}' is not a port")))?,
            None => api::SMTP_PORT,
        };

        let smtp = SmtpConfig {
            server: var("SMTP_SERVER").unwrap_or_else(|| api::SMTP_SERVER.to_string()),
            port,
            username: var("GMAIL_SENDER").unwrap_or_default(),
            password: var("GMAIL_APP_PASSWORD").unwrap_or_default(),
            to: var("GMAIL_RECEIVER").unwrap_or_default(),
        };

        Ok(Self {
            feeds,
            cache_dir: cache_dir.to_path_buf(),
            gist,
            scholar: ScholarConfig::new(var("SEMANTIC_SCHOLAR_API_KEY")),
            smtp,
        })
    }

    /// Fail unless mail can actually be sent.
    pub fn require_smtp(&self) -> ConfigResult<()> {
        if self.smtp.username.is_empty() {
            return Err(ConfigError::Missing("GMAIL_SENDER"));
        }
        if self.smtp.to.is_empty() {
            return Err(ConfigError::Missing("GMAIL_RECEIVER"));
        }
        Ok(())
    }

    /// Run settings shortcut.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.feeds.settings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.author_cache_expiry_days, 180);
        assert_eq!(settings.sent_papers_expiry_days, 30);
        assert_eq!(settings.max_authors_to_evaluate, 5);
        assert_eq!(settings.max_papers_per_run, 50);
        assert!(settings.evaluate_authors);
    }

    #[test]
    fn test_feeds_yaml_parses_partial_settings() {
        let yaml = r"
arxiv:
  - url: https://rss.arxiv.org/rss/quant-ph
    category: quant-ph
    filters:
      keywords:
        enabled: true
        include: [entanglement]
journals:
  - url: https://feeds.aps.org/rss/recent/prxquantum.xml
    name: PRX Quantum
    symbol: PRX-Q
settings:
  max_papers_per_run: 10
";
        let feeds = FeedsConfig::from_yaml(yaml).unwrap();
        assert_eq!(feeds.arxiv.len(), 1);
        assert_eq!(feeds.arxiv[0].category, "quant-ph");
        assert!(feeds.arxiv[0].filters.keywords.enabled);
        assert_eq!(feeds.journals[0].symbol.as_deref(), Some("PRX-Q"));
        assert_eq!(feeds.settings.max_papers_per_run, 10);
        assert_eq!(feeds.settings.sent_papers_expiry_days, 30);
    }

    #[test]
    fn test_feeds_yaml_rejects_empty_url() {
        let yaml = "arxiv:\n  - url: ''\n";
        assert!(FeedsConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_gist_requires_both_credentials() {
        let only_id = Config::from_lookup(
            FeedsConfig::default(),
            Path::new(".cache"),
            lookup(&[("GIST_ID", "abc")]),
        )
        .unwrap();
        assert!(only_id.gist.is_none());

        let both = Config::from_lookup(
            FeedsConfig::default(),
            Path::new(".cache"),
            lookup(&[("GIST_ID", "abc"), ("GH_GIST_TOKEN", "tok")]),
        )
        .unwrap();
        assert_eq!(both.gist.unwrap().gist_id, "abc");
    }

    #[test]
    fn test_smtp_port_must_parse() {
        let result = Config::from_lookup(
            FeedsConfig::default(),
            Path::new(".cache"),
            lookup(&[("SMTP_PORT", "submission")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_require_smtp() {
        let config =
            Config::from_lookup(FeedsConfig::default(), Path::new(".cache"), lookup(&[])).unwrap();
        assert!(config.require_smtp().is_err());

        let config = Config::from_lookup(
            FeedsConfig::default(),
            Path::new(".cache"),
            lookup(&[("GMAIL_SENDER", "me@example.org"), ("GMAIL_RECEIVER", "you@example.org")]),
        )
        .unwrap();
        assert!(config.require_smtp().is_ok());
        assert_eq!(config.smtp.port, 587);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(
            FeedsConfig::default(),
            Path::new(".cache"),
            lookup(&[("GIST_ID", "abc"), ("GH_GIST_TOKEN", "ghp_secret"), ("GMAIL_APP_PASSWORD", "pw123")]),
        )
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("pw123"));
    }

    #[test]
    fn test_scholar_delay_depends_on_key() {
        assert_eq!(ScholarConfig::new(None).rate_limit_delay, api::RATE_LIMIT_DELAY);
        assert_eq!(
            ScholarConfig::new(Some("k".into())).rate_limit_delay,
            api::RATE_LIMIT_DELAY_WITH_KEY
        );
    }
}
