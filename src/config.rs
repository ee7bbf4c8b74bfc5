use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Configuration for the catalog worker
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// YouTube Data API settings
    pub youtube: YouTubeConfig,

    /// Caption fetching settings
    pub captions: CaptionConfig,

    /// Performance extraction settings
    pub extraction: ExtractionConfig,

    /// Pipeline scheduling settings
    pub pipeline: PipelineConfig,

    /// Catalog store settings
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API key for the YouTube Data API (required)
    pub api_key: Option<String>,

    /// Channel to ingest (required)
    pub channel_id: Option<String>,

    /// Results per search page (the API maximum is 50)
    pub page_size: u32,

    /// Video ids per details call (the API maximum is 50)
    pub details_batch_size: usize,

    /// Delay between search pages in milliseconds
    pub page_delay_ms: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Maximum fetch attempts per video
    pub max_retries: u32,

    /// Base retry delay in milliseconds (backoff is delay * attempt)
    pub retry_delay_ms: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Client identity sent on watch-page requests. The caption source
    /// serves different markup to unidentified clients, so this must look
    /// like a real browser.
    pub user_agent: String,

    /// Secondary transcript provider, used when the primary has no captions
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Enable the fallback provider
    pub enabled: bool,

    /// Provider endpoint (POST)
    pub url: Option<String>,

    /// Videos longer than this are never sent to the fallback provider
    pub max_video_duration_seconds: u32,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Show name that must appear in an episode title
    pub show_name: String,

    /// Title keywords that disqualify a video from being an episode
    pub non_episode_markers: Vec<String>,

    /// Suppress transcript mentions of these names (hosts, band, regulars)
    pub denylist_enabled: bool,

    /// Known non-contestant speakers
    pub denylist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent caption fetches per batch
    pub concurrency: usize,

    /// Pause between batches in milliseconds (upstream politeness)
    pub batch_delay_ms: u64,

    /// Default video budget for a `recent` run
    pub default_max_videos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for the JSON catalog store
    pub catalog_dir: PathBuf,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            channel_id: None,
            page_size: 50,
            details_batch_size: 50,
            page_delay_ms: 100,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            max_video_duration_seconds: 4 * 3600,
            request_timeout_seconds: 60,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            show_name: "Kill Tony".to_string(),
            non_episode_markers: vec![
                "clip".to_string(),
                "compilation".to_string(),
                "trailer".to_string(),
                "highlights".to_string(),
                "best of".to_string(),
                "preview".to_string(),
            ],
            denylist_enabled: true,
            denylist: vec![
                "Tony Hinchcliffe".to_string(),
                "Tony".to_string(),
                "Brian Redban".to_string(),
                "Redban".to_string(),
                "Brian".to_string(),
                "William Montgomery".to_string(),
                "The Band".to_string(),
                "Band".to_string(),
                "Kill Tony".to_string(),
                "Austin".to_string(),
                "Texas".to_string(),
                "America".to_string(),
            ],
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            batch_delay_ms: 500,
            default_max_videos: 50,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("./catalog"),
        }
    }
}

impl Config {
    /// Load configuration: explicit path, then conventional locations,
    /// then defaults. Environment variables override file values.
    pub fn load(explicit_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow!("Cannot parse config file {}: {}", path.display(), e))?
            }
            None => Self::load_conventional(),
        };

        config.apply_env();
        Ok(config)
    }

    fn load_conventional() -> Self {
        let config_paths = ["kt-worker.toml", "config/kt-worker.toml"];

        for path in &config_paths {
            if let Ok(raw) = std::fs::read_to_string(path) {
                match toml::from_str(&raw) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::default()
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(api_key);
        }

        if let Ok(channel_id) = std::env::var("YOUTUBE_CHANNEL_ID") {
            self.youtube.channel_id = Some(channel_id);
        }

        if let Ok(url) = std::env::var("TRANSCRIPT_FALLBACK_URL") {
            self.captions.fallback.url = Some(url);
            self.captions.fallback.enabled = true;
        }

        if let Ok(enabled) = std::env::var("TRANSCRIPT_FALLBACK_ENABLED") {
            self.captions.fallback.enabled = enabled == "true" || enabled == "1";
        }

        if let Ok(concurrency) = std::env::var("KT_WORKER_CONCURRENCY") {
            if let Ok(value) = concurrency.parse() {
                self.pipeline.concurrency = value;
            }
        }

        if let Ok(dir) = std::env::var("KT_WORKER_CATALOG_DIR") {
            self.store.catalog_dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration before a run
    pub fn validate(&self) -> Result<()> {
        if self.youtube.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(anyhow!(
                "YouTube API key missing (set YOUTUBE_API_KEY or youtube.api_key)"
            ));
        }

        if self.youtube.channel_id.as_deref().unwrap_or("").is_empty() {
            return Err(anyhow!(
                "YouTube channel id missing (set YOUTUBE_CHANNEL_ID or youtube.channel_id)"
            ));
        }

        if self.pipeline.concurrency == 0 {
            return Err(anyhow!("pipeline.concurrency must be greater than 0"));
        }

        if self.captions.max_retries == 0 {
            return Err(anyhow!("captions.max_retries must be greater than 0"));
        }

        if self.youtube.page_size == 0 || self.youtube.page_size > 50 {
            return Err(anyhow!("youtube.page_size must be between 1 and 50"));
        }

        if self.youtube.details_batch_size == 0 || self.youtube.details_batch_size > 50 {
            return Err(anyhow!("youtube.details_batch_size must be between 1 and 50"));
        }

        if self.captions.fallback.enabled {
            let url = self
                .captions
                .fallback
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("Fallback provider enabled but no URL configured"))?;
            Url::parse(url).map_err(|e| anyhow!("Invalid fallback provider URL: {}", e))?;
        }

        Ok(())
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.youtube.api_key = Some(api_key.into());
        self
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.config.youtube.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.pipeline.concurrency = concurrency;
        self
    }

    pub fn with_catalog_dir(mut self, dir: PathBuf) -> Self {
        self.config.store.catalog_dir = dir;
        self
    }

    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.config.captions.fallback.url = Some(url.into());
        self.config.captions.fallback.enabled = true;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
