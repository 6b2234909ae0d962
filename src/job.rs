use std::sync::Arc;
use reqwest::Url;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::config::{CrawlOptions, FetchSettings};
use crate::error::AppError;
use crate::export::export_workbook;
use crate::fetcher::Fetcher;
use crate::state::{JobContext, JobState};
use crate::tasks::run_crawl_task;

/// The single crawl job of a process: start, stop, poll, export.
///
/// Share it behind an `Arc`. At most one crawl runs at a time; the state of
/// the last one stays readable until the next `start`.
pub struct CrawlJob {
    settings: FetchSettings,
    state: Arc<RwLock<JobState>>,
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CrawlJob {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            state: Arc::new(RwLock::new(JobState::default())),
            cancel: Mutex::new(CancellationToken::new()),
            task: Mutex::new(None),
        }
    }

    /// Reset the state and spawn the crawl in the background.
    pub async fn start(&self, options: CrawlOptions) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.status.is_running() {
            warn!("Rejected start for {}: a crawl is already running", options.root_url);
            return Err(AppError::AlreadyRunning);
        }

        let root = normalize_root_url(&options.root_url)?;
        let fetcher = Fetcher::new(&self.settings)?;

        let token = CancellationToken::new();
        *self.cancel.lock().await = token.clone();
        *state = JobState::started(&root, &options);
        drop(state);

        info!("Starting {:?} crawl of {} (delay {}ms)", options.mode, root, options.delay_ms);
        let ctx = JobContext::new(self.state.clone(), token, root, &options);
        let handle = tokio::spawn(run_crawl_task(ctx, fetcher, options.mode));
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Ask the running crawl to stop at its next checkpoint. Always acknowledged.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if state.status.is_running() {
            info!("Stop requested");
            state.stop_requested = true;
            self.cancel.lock().await.cancel();
        }
    }

    /// Point-in-time copy of the job state.
    pub async fn status(&self) -> JobState {
        self.state.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.status.is_running()
    }

    /// Workbook bytes for the current results, `None` when there are none.
    pub async fn export_to_table(&self) -> Result<Option<Vec<u8>>, AppError> {
        let snapshot = self.status().await;
        export_workbook(&snapshot)
    }

    /// Wait for the background task of the current job, if any.
    pub async fn wait(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Crawl task ended abnormally: {}", e);
            }
        }
    }
}

/// Parse a root listing URL: http(s) only, no query or fragment, trailing `/`.
pub fn normalize_root_url(raw: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| AppError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(format!("{}: only http and https are supported", raw)));
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
