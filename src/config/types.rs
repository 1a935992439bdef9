use crate::collector::DelayRange;
use crate::storage::EntityId;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Review-Harvester
///
/// Every section is optional; omitted sections fall back to the defaults
/// below, which reproduce the behaviour of a bare run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub resolver: ResolverConfig,
    pub pager: PagerConfig,
    pub extractor: ExtractorConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
    pub browser: BrowserConfig,
}

/// Where targets live and how their content is located
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Page address for one target; `{id}` is replaced by the target identifier
    pub url_template: String,

    /// Query matching every revealed record node, in reveal order
    pub item_query: String,

    /// Query for the header advertising the total record count
    pub total_count_query: Option<String>,

    /// Query for the embedded state document used by `dump-state`
    pub state_query: String,

    /// Field holding the record timestamp (the dedup key)
    pub timestamp: FieldSelector,

    /// Field holding the record rating
    pub rating: FieldSelector,

    /// Item nodes revealed per scroll when replaying HTML snapshots
    pub snapshot_page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: "https://yandex.ru/maps/org/{id}/reviews/".to_string(),
            item_query: ".business-review-view__info".to_string(),
            total_count_query: None,
            state_query: "script.state-view".to_string(),
            timestamp: FieldSelector {
                query: r#".business-review-view__date meta[itemprop="datePublished"]"#.to_string(),
                attribute: Some("content".to_string()),
            },
            rating: FieldSelector {
                query: r#"[itemtype="http://schema.org/Rating"] meta[itemprop="ratingValue"]"#
                    .to_string(),
                attribute: Some("content".to_string()),
            },
            snapshot_page_size: 10,
        }
    }
}

impl SourceConfig {
    /// Builds the page address for one target
    pub fn target_url(&self, id: &EntityId) -> Result<Url, url::ParseError> {
        Url::parse(&self.url_template.replace("{id}", id.as_str()))
    }
}

/// A sub-node query plus the attribute to read from it
///
/// When `attribute` is absent the node's text is read instead.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldSelector {
    pub query: String,
    #[serde(default)]
    pub attribute: Option<String>,
}

/// Bounded-retry element resolution
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Total lookup attempts before giving up
    pub attempts: u32,

    /// How long a single attempt waits for the element (milliseconds)
    pub timeout_ms: u64,

    /// Pause between failed attempts (milliseconds)
    pub backoff_ms: u64,

    /// Polling interval inside one attempt (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout_ms: 10_000,
            backoff_ms: 1_000,
            poll_interval_ms: 250,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Scroll strategy and stall policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PagerConfig {
    /// Hard ceiling on scroll attempts per target
    pub max_scroll_attempts: u32,

    /// Attempts allowed with zero records before the target is abandoned
    pub stall_threshold: u32,

    /// Pixel offset of the fixed scroll tactic
    pub fixed_offset: i64,

    /// Lower bound of the randomized scroll tactic (pixels)
    pub random_offset_min: i64,

    /// Upper bound of the randomized scroll tactic (pixels)
    pub random_offset_max: i64,

    /// Lower bound of the pause after each scroll (milliseconds)
    pub pause_min_ms: u64,

    /// Upper bound of the pause after each scroll (milliseconds)
    pub pause_max_ms: u64,

    /// Emit a progress event every this many scrolls (0 disables)
    pub progress_every: u32,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: 30,
            stall_threshold: 10,
            fixed_offset: 700,
            random_offset_min: 500,
            random_offset_max: 900,
            pause_min_ms: 500,
            pause_max_ms: 1_500,
            progress_every: 5,
        }
    }
}

impl PagerConfig {
    pub fn pause(&self) -> DelayRange {
        DelayRange::from_millis(self.pause_min_ms, self.pause_max_ms)
    }
}

/// Per-node extraction pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractorConfig {
    /// Pause after each inspected node (milliseconds)
    pub node_pause_ms: u64,

    /// Scroll each node into view before reading it
    pub focus_each_node: bool,

    /// Wait after opening a target before the first inspection (milliseconds)
    pub settle_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            node_pause_ms: 100,
            focus_each_node: true,
            settle_ms: 2_000,
        }
    }
}

impl ExtractorConfig {
    pub fn node_pause(&self) -> Duration {
        Duration::from_millis(self.node_pause_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Batch pacing and limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatchConfig {
    /// Record limit per target when none is given on the command line
    pub default_limit: usize,

    /// Lower bound of the pause between targets (milliseconds)
    pub delay_min_ms: u64,

    /// Upper bound of the pause between targets (milliseconds)
    pub delay_max_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            delay_min_ms: 2_000,
            delay_max_ms: 2_000,
        }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> DelayRange {
        DelayRange::from_millis(self.delay_min_ms, self.delay_max_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the JSON record store
    pub store_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("json").join("reviews.json"),
        }
    }
}

/// Live browser options (only read by the chromium source)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { headless: true }
    }
}
