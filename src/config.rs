use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::AppError;
use crate::records::CrawlMode;

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Per-job start arguments.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub root_url: String,
    pub delay_ms: u64,
    pub mode: CrawlMode,
    pub max_depth: usize,
}

impl CrawlOptions {
    pub fn new(root_url: impl Into<String>, mode: CrawlMode) -> Self {
        Self {
            root_url: root_url.into(),
            delay_ms: DEFAULT_DELAY_MS,
            mode,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// HTTP settings shared by every job a `CrawlJob` runs.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub crawl: CrawlOptions,
    pub fetch: FetchSettings,
    pub export_dir: PathBuf,
    pub status_interval: Duration,
}

impl Settings {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let root_url = lookup("INDEX_ROOT_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("INDEX_ROOT_URL must be set".to_string()))?;

        let mode = match lookup("CRAWL_MODE") {
            Some(raw) => raw.parse::<CrawlMode>().map_err(AppError::Config)?,
            None => CrawlMode::default(),
        };

        let crawl = CrawlOptions {
            root_url,
            delay_ms: parse_var(&lookup, "CRAWL_DELAY_MS", DEFAULT_DELAY_MS)?,
            mode,
            max_depth: parse_var(&lookup, "CRAWL_MAX_DEPTH", DEFAULT_MAX_DEPTH)?,
        };

        let fetch = FetchSettings {
            timeout: Duration::from_secs(parse_var(&lookup, "FETCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            user_agent: lookup("FETCH_USER_AGENT")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };

        Ok(Self {
            crawl,
            fetch,
            export_dir: lookup("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            status_interval: Duration::from_secs(parse_var(&lookup, "STATUS_INTERVAL_SECS", 5u64)?.max(1)),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))),
        None => Ok(default),
    }
}
