use std::sync::Arc;
use std::time::Duration;
use reqwest::Url;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use crate::config::CrawlOptions;
use crate::error::AppError;
use crate::listing::folder_name;
use crate::records::{CrawlMode, EpisodeRecord, FailureRecord, MediaRecord};

/// Percent shown while a crawl is still running; the total is unknown until the walk ends.
const RUNNING_PERCENT_CAP: usize = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    /// Walking listings, no media file handled yet.
    Scanning,
    /// At least one media file handled.
    Scraping,
    Complete,
    Stopped,
    Error,
}

impl JobStatus {
    pub fn is_running(self) -> bool {
        matches!(self, JobStatus::Scanning | JobStatus::Scraping)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed_count: usize,
    /// Media files seen in parsed listings so far.
    pub total_count: usize,
    pub current_directory: String,
    pub current_item: String,
    pub percent: u8,
}

/// Everything a status query can see about the current (or last) job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobState {
    pub status: JobStatus,
    pub mode: CrawlMode,
    pub root_url: String,
    pub delay_ms: u64,
    pub progress: Progress,
    pub movies: Vec<MediaRecord>,
    pub episodes: Vec<EpisodeRecord>,
    pub failures: Vec<FailureRecord>,
    pub fetched_count: usize,
    pub stop_requested: bool,
    pub error: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl JobState {
    /// Fresh state for a job that is about to run.
    pub fn started(root: &Url, options: &CrawlOptions) -> Self {
        Self {
            status: JobStatus::Scanning,
            mode: options.mode,
            root_url: root.to_string(),
            delay_ms: options.delay_ms,
            started_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn result_count(&self) -> usize {
        match self.mode {
            CrawlMode::Movies => self.movies.len(),
            CrawlMode::Series => self.episodes.len(),
        }
    }

    fn file_processed(&mut self, label: String) {
        self.status = JobStatus::Scraping;
        self.progress.processed_count += 1;
        self.progress.total_count = self.progress.total_count.max(self.progress.processed_count);
        self.progress.current_item = label;
        self.progress.percent = self.progress.processed_count.min(RUNNING_PERCENT_CAP) as u8;
    }
}

/// Handle the orchestrator uses to report into the shared job state.
///
/// The orchestrator task is the only writer; status readers take a short
/// read lock and clone.
#[derive(Debug, Clone)]
pub struct JobContext {
    state: Arc<RwLock<JobState>>,
    cancel: CancellationToken,
    root: Url,
    delay: Duration,
    max_depth: usize,
}

impl JobContext {
    pub fn new(state: Arc<RwLock<JobState>>, cancel: CancellationToken, root: Url, options: &CrawlOptions) -> Self {
        Self {
            state,
            cancel,
            root,
            delay: Duration::from_millis(options.delay_ms),
            max_depth: options.max_depth,
        }
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Cooperative checkpoint.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The fixed inter-request delay; returns early when a stop arrives.
    pub async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    pub async fn enter_directory(&self, url: &Url) {
        self.state.write().await.progress.current_directory = folder_name(url);
    }

    pub async fn discovered(&self, media_files: usize) {
        if media_files > 0 {
            self.state.write().await.progress.total_count += media_files;
        }
    }

    pub async fn note_fetched(&self, fetched: usize) {
        self.state.write().await.fetched_count = fetched;
    }

    pub async fn record_movie(&self, record: MediaRecord) {
        let mut state = self.state.write().await;
        state.file_processed(record.label());
        state.movies.push(record);
    }

    pub async fn record_episode(&self, record: EpisodeRecord) {
        let mut state = self.state.write().await;
        state.file_processed(record.label());
        state.episodes.push(record);
    }

    pub async fn record_failure(&self, failure: FailureRecord) {
        let mut state = self.state.write().await;
        state.file_processed(crate::records::display_label(&failure.title, &failure.year));
        state.failures.push(failure);
    }

    /// Terminal transition. Errors win over a pending stop.
    pub async fn finish(&self, outcome: Result<(), AppError>) {
        let mut state = self.state.write().await;
        match outcome {
            Ok(()) if self.cancel.is_cancelled() => {
                state.status = JobStatus::Stopped;
            }
            Ok(()) => {
                state.status = JobStatus::Complete;
                state.progress.percent = 100;
                state.progress.total_count = state.progress.processed_count;
            }
            Err(e) => {
                state.status = JobStatus::Error;
                state.error = Some(e.to_string());
            }
        }
        state.progress.current_directory.clear();
        state.progress.current_item.clear();
        state.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }
}
