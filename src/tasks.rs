use tracing::{error, info};
use crate::error::AppError;
use crate::fetcher::Fetcher;
use crate::movie_crawler::MovieCrawler;
use crate::records::CrawlMode;
use crate::series_crawler::SeriesCrawler;
use crate::state::JobContext;

/// Background body of one crawl job.
///
/// The walk itself runs in an inner task so that a panic deep inside it
/// still ends the job in `error` instead of leaving it stuck as running.
pub async fn run_crawl_task(ctx: JobContext, fetcher: Fetcher, mode: CrawlMode) {
    info!("Crawl task: starting {:?} crawl of {}", mode, ctx.root());

    let walker_ctx = ctx.clone();
    let walk = tokio::spawn(async move {
        match mode {
            CrawlMode::Movies => MovieCrawler::new(walker_ctx, fetcher).run().await,
            CrawlMode::Series => SeriesCrawler::new(walker_ctx, fetcher).run().await,
        }
    });

    let outcome = match walk.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AppError::Task("crawl task panicked".to_string())),
        Err(e) => Err(AppError::Task(e.to_string())),
    };

    if let Err(e) = &outcome {
        error!("Crawl failed: {}", e);
    } else if ctx.is_cancelled() {
        info!("Crawl task: stopped on request");
    } else {
        info!("Crawl task: finished");
    }

    ctx.finish(outcome).await;
}
