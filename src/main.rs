use std::sync::Arc;
use tracing::{debug, info, warn};
use indexmapper::export::export_file_name;
use indexmapper::{CrawlJob, JobStatus, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;
    info!(
        "Root: {}, mode: {:?}, delay: {}ms, max depth: {}",
        settings.crawl.root_url, settings.crawl.mode, settings.crawl.delay_ms, settings.crawl.max_depth
    );

    let job = Arc::new(CrawlJob::new(settings.fetch.clone()));
    job.start(settings.crawl.clone()).await?;

    let mut ticker = tokio::time::interval(settings.status_interval);
    ticker.tick().await;
    let mut stop_sent = false;

    while job.is_running().await {
        tokio::select! {
            result = tokio::signal::ctrl_c(), if !stop_sent => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                } else {
                    info!("Ctrl-C received, stopping after the current item");
                    job.stop().await;
                }
                stop_sent = true;
            }
            _ = ticker.tick() => {
                let status = job.status().await;
                info!(
                    "[{:?}] {} processed, {} discovered, {} failed, {}% | {} | {}",
                    status.status,
                    status.progress.processed_count,
                    status.progress.total_count,
                    status.failures.len(),
                    status.progress.percent,
                    status.progress.current_directory,
                    status.progress.current_item,
                );
            }
        }
    }
    job.wait().await;

    let status = job.status().await;
    debug!("Final state: {}", serde_json::to_string(&status)?);
    match status.status {
        JobStatus::Error => warn!(
            "Crawl failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ),
        other => info!(
            "Crawl {:?}: {} records, {} failures, {} listings fetched",
            other,
            status.result_count(),
            status.failures.len(),
            status.fetched_count
        ),
    }

    match job.export_to_table().await? {
        Some(bytes) => {
            std::fs::create_dir_all(&settings.export_dir)?;
            let path = settings.export_dir.join(export_file_name(status.mode));
            std::fs::write(&path, bytes)?;
            info!("Exported {}", path.display());
        }
        None => info!("Nothing to export"),
    }

    if status.status == JobStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}
