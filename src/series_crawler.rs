use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Url;
use tracing::{debug, info, warn};
use crate::error::AppError;
use crate::fetcher::Fetcher;
use crate::identification::{infer_episode_info, is_season_folder, strip_extension};
use crate::listing::{last_segment, parse_listing, DirectoryNode};
use crate::records::{EpisodeRecord, FailureRecord};
use crate::state::JobContext;
use crate::structure::{detect_structure, season_segment_from_path, series_segment_from_path, SeriesLayout};

/// Season folder name given to media files lying next to season folders.
const LOOSE_EPISODE_SEASON: &str = "Season 1";

/// Where a folder of episodes gets its series name from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesName {
    /// The folder itself: it was reached as one child of a multi-series listing.
    FromFolder,
    /// The crawl root, named by walking its URL path.
    FromPath,
}

/// Walks a TV archive, re-detecting the layout at every candidate series root.
pub struct SeriesCrawler {
    ctx: JobContext,
    fetcher: Fetcher,
}

impl SeriesCrawler {
    pub fn new(ctx: JobContext, fetcher: Fetcher) -> Self {
        Self { ctx, fetcher }
    }

    pub async fn run(mut self) -> Result<(), AppError> {
        let root = self.ctx.root().clone();
        info!("Crawling series under {}", root);
        self.ctx.enter_directory(&root).await;

        let layout = self
            .detect(&root)
            .await
            .ok_or_else(|| AppError::RootUnreachable(root.to_string()))?;
        self.process_layout(root, layout, 0, SeriesName::FromPath).await
    }

    fn process_root(&mut self, url: Url, depth: usize) -> BoxFuture<'_, Result<(), AppError>> {
        async move {
            if depth > self.ctx.max_depth() || self.ctx.is_cancelled() {
                return Ok(());
            }

            info!("Crawling directory: {}", url);
            self.ctx.enter_directory(&url).await;

            match self.detect(&url).await {
                Some(layout) => self.process_layout(url, layout, depth, SeriesName::FromFolder).await,
                None => Ok(()),
            }
        }
        .boxed()
    }

    async fn process_layout(
        &mut self,
        url: Url,
        layout: SeriesLayout,
        depth: usize,
        naming: SeriesName,
    ) -> Result<(), AppError> {
        debug!("{} looks like {:?}", url, layout.kind());
        match layout {
            SeriesLayout::SingleSeries { seasons, loose_episodes } => {
                let series_raw = last_segment(&url).to_string();
                self.ctx.discovered(loose_episodes.len()).await;

                for season in seasons {
                    if self.ctx.is_cancelled() {
                        return Ok(());
                    }
                    let season_raw = last_segment(&season.url).to_string();
                    self.crawl_season(series_raw.clone(), season_raw, season.url, depth + 1)
                        .await?;
                    self.ctx.pause().await;
                }

                self.process_episodes(&series_raw, LOOSE_EPISODE_SEASON, loose_episodes)
                    .await;
            }
            SeriesLayout::SingleSeason { episodes } => {
                let series_raw = match naming {
                    SeriesName::FromFolder => last_segment(&url).to_string(),
                    SeriesName::FromPath => series_segment_from_path(&url),
                };
                let season_raw = season_segment_from_path(&url);
                self.ctx.discovered(episodes.len()).await;
                self.process_episodes(&series_raw, &season_raw, episodes).await;
            }
            SeriesLayout::MultiSeries { series } => {
                for candidate in series {
                    if self.ctx.is_cancelled() {
                        return Ok(());
                    }
                    self.process_root(candidate.url, depth + 1).await?;
                    self.ctx.pause().await;
                }
            }
        }
        Ok(())
    }

    /// Everything under a season folder belongs to that season, unless a
    /// nested folder names a season of its own.
    fn crawl_season(
        &mut self,
        series_raw: String,
        season_raw: String,
        url: Url,
        depth: usize,
    ) -> BoxFuture<'_, Result<(), AppError>> {
        async move {
            if depth > self.ctx.max_depth() || self.ctx.is_cancelled() {
                return Ok(());
            }

            info!("Crawling directory: {}", url);
            self.ctx.enter_directory(&url).await;

            let Some(nodes) = self.fetch_listing(&url).await else {
                return Ok(());
            };
            let (dirs, files): (Vec<_>, Vec<_>) = nodes.into_iter().partition(|n| n.is_directory);
            self.ctx.discovered(files.len()).await;

            for dir in dirs {
                if self.ctx.is_cancelled() {
                    return Ok(());
                }
                let nested = last_segment(&dir.url);
                let nested_season = if is_season_folder(nested) {
                    nested.to_string()
                } else {
                    season_raw.clone()
                };
                self.crawl_season(series_raw.clone(), nested_season, dir.url, depth + 1)
                    .await?;
                self.ctx.pause().await;
            }

            self.process_episodes(&series_raw, &season_raw, files).await;
            Ok(())
        }
        .boxed()
    }

    async fn process_episodes(&self, series_raw: &str, season_raw: &str, files: Vec<DirectoryNode>) {
        for file in files {
            if self.ctx.is_cancelled() {
                return;
            }
            self.process_file(series_raw, season_raw, &file).await;
            self.ctx.pause().await;
        }
    }

    async fn process_file(&self, series_raw: &str, season_raw: &str, file: &DirectoryNode) {
        match classify_episode(series_raw, season_raw, file) {
            Ok(record) => {
                debug!("Found episode: {}", record.label());
                self.ctx.record_episode(record).await;
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

    async fn detect(&mut self, url: &Url) -> Option<SeriesLayout> {
        let layout = detect_structure(&mut self.fetcher, url, self.ctx.root()).await;
        self.ctx.note_fetched(self.fetcher.visited_count()).await;
        layout
    }

    async fn fetch_listing(&mut self, url: &Url) -> Option<Vec<DirectoryNode>> {
        let body = self.fetcher.fetch(url).await;
        self.ctx.note_fetched(self.fetcher.visited_count()).await;
        let html = String::from_utf8_lossy(&body?).into_owned();
        Some(parse_listing(&html, url, self.ctx.root()))
    }
}

/// Turn one episode file into a record, given the raw series and season folder names.
pub fn classify_episode(series_raw: &str, season_raw: &str, file: &DirectoryNode) -> Result<EpisodeRecord, AppError> {
    let guess = infer_episode_info(series_raw, season_raw, last_segment(&file.url));
    debug!(
        "{} matched season {:?}, episode {:?}",
        file.name, guess.season_rule, guess.episode_rule
    );
    if guess.series_title.is_empty() {
        return Err(AppError::Classification(format!("no series title for '{}'", file.name)));
    }
    Ok(EpisodeRecord {
        series_title: guess.series_title,
        series_year: guess.series_year,
        season_number: guess.season_number,
        season_title: guess.season_title,
        episode_number: guess.episode_number,
        episode_title: guess.episode_title,
        source_url: file.url.to_string(),
    })
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
    fn episode_inside_season_folder() {
        let record = classify_episode(
            "Show",
            "S1",
            &file("http://h/tv/Show/S1/S01E03%20-%20The%20Beginning.mkv"),
        )
        .unwrap();
        assert_eq!(record.series_title, "Show");
        assert_eq!(record.season_number, 1);
        assert_eq!(record.season_title, "Season 1");
        assert_eq!(record.episode_number, 3);
        assert_eq!(record.episode_title, "The Beginning");
    }

    #[test]
    fn loose_episode_lands_in_season_one() {
        let record = classify_episode("Dark%20(2017)", LOOSE_EPISODE_SEASON, &file("http://h/tv/Dark%20(2017)/03.mkv"))
            .unwrap();
        assert_eq!(record.series_title, "Dark");
        assert_eq!(record.series_year, "2017");
        assert_eq!(record.season_number, 1);
        assert_eq!(record.episode_number, 3);
    }

    #[test]
    fn empty_series_name_fails() {
        let err = classify_episode("", "", &file("http://h/01.mkv")).unwrap_err();
        assert!(matches!(err, AppError::Classification(_)));
    }
}
