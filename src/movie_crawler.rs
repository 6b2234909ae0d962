use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Url;
use tracing::{debug, info, warn};
use crate::error::AppError;
use crate::fetcher::Fetcher;
use crate::identification::{infer_movie_info, strip_extension};
use crate::listing::{last_segment, parse_listing, DirectoryNode};
use crate::records::{FailureRecord, MediaRecord};
use crate::state::JobContext;

/// Depth-first, directories-first walk that turns every media file into a movie.
pub struct MovieCrawler {
    ctx: JobContext,
    fetcher: Fetcher,
}

impl MovieCrawler {
    pub fn new(ctx: JobContext, fetcher: Fetcher) -> Self {
        Self { ctx, fetcher }
    }

    pub async fn run(mut self) -> Result<(), AppError> {
        let root = self.ctx.root().clone();
        info!("Crawling movies under {}", root);
        self.ctx.enter_directory(&root).await;

        let nodes = self
            .fetch_listing(&root)
            .await
            .ok_or_else(|| AppError::RootUnreachable(root.to_string()))?;
        self.process_nodes(nodes, 0).await
    }

    fn crawl_directory(&mut self, url: Url, depth: usize) -> BoxFuture<'_, Result<(), AppError>> {
        async move {
            if depth > self.ctx.max_depth() {
                debug!("Max depth reached at {}", url);
                return Ok(());
            }
            if self.ctx.is_cancelled() {
                return Ok(());
            }

            info!("Crawling directory: {}", url);
            self.ctx.enter_directory(&url).await;

            match self.fetch_listing(&url).await {
                Some(nodes) => self.process_nodes(nodes, depth).await,
                None => Ok(()),
            }
        }
        .boxed()
    }

    async fn process_nodes(&mut self, nodes: Vec<DirectoryNode>, depth: usize) -> Result<(), AppError> {
        let (dirs, files): (Vec<_>, Vec<_>) = nodes.into_iter().partition(|n| n.is_directory);
        self.ctx.discovered(files.len()).await;

        for dir in dirs {
            if self.ctx.is_cancelled() {
                return Ok(());
            }
            self.crawl_directory(dir.url, depth + 1).await?;
            self.ctx.pause().await;
        }

        for file in files {
            if self.ctx.is_cancelled() {
                return Ok(());
            }
            self.process_file(&file).await;
            self.ctx.pause().await;
        }

        Ok(())
    }

    async fn process_file(&self, file: &DirectoryNode) {
        match classify_movie(file) {
            Ok(record) => {
                debug!("Found movie: {}", record.label());
                self.ctx.record_movie(record).await;
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.url, e);
                self.ctx
                    .record_failure(FailureRecord {
                        title: strip_extension(&file.name),
                        year: String::new(),
                        url: file.url.to_string(),
                        error: e.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn fetch_listing(&mut self, url: &Url) -> Option<Vec<DirectoryNode>> {
        let body = self.fetcher.fetch(url).await;
        self.ctx.note_fetched(self.fetcher.visited_count()).await;
        let html = String::from_utf8_lossy(&body?).into_owned();
        Some(parse_listing(&html, url, self.ctx.root()))
    }
}

/// Turn one media file into a movie record, or explain why it can't be.
pub fn classify_movie(file: &DirectoryNode) -> Result<MediaRecord, AppError> {
    let guess = infer_movie_info(last_segment(&file.url), file.url.path());
    debug!("{} matched {:?}", file.name, guess.rule);
    if guess.title.is_empty() {
        return Err(AppError::Classification(format!("no title in '{}'", file.name)));
    }
    Ok(MediaRecord::new(guess.title, guess.year, file.url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::folder_name;

    fn file(url: &str) -> DirectoryNode {
        let url = Url::parse(url).unwrap();
        let name = folder_name(&url);
        DirectoryNode { url, is_directory: false, name }
    }

    #[test]
    fn folder_year_wins() {
        let record = classify_movie(&file("http://h/Data/Inception%20(2010)/movie.mkv")).unwrap();
        assert_eq!(record.title, "Inception");
        assert_eq!(record.year, "2010");
        assert_eq!(record.source_url, "http://h/Data/Inception%20(2010)/movie.mkv");
        assert!(record.plot.is_empty());
    }

    #[test]
    fn port_is_not_a_year() {
        let record = classify_movie(&file("http://h:8080/Data/file.mkv")).unwrap();
        assert_eq!(record.title, "file");
        assert_eq!(record.year, "");
    }

    #[test]
    fn bare_extension_is_a_classification_failure() {
        let err = classify_movie(&file("http://h/Data/.mkv")).unwrap_err();
        assert!(matches!(err, AppError::Classification(_)));
    }
}
