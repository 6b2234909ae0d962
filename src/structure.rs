use reqwest::Url;
use serde::Serialize;
use tracing::debug;
use crate::fetcher::Fetcher;
use crate::identification::is_season_folder;
use crate::listing::{parse_listing, percent_decode, DirectoryNode};

/// Path segments that usually sit directly above a series folder.
const TV_PATH_MARKERS: &[&str] = &[
    "tv series", "tv-series", "tv_series", "tvseries", "tv shows", "tv-shows", "tv_shows",
    "tvshows", "tv show", "tv", "series", "shows", "web series", "anime",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    SingleSeries,
    SingleSeason,
    MultiSeries,
}

/// How the children of a series-mode directory are to be walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesLayout {
    /// Season folders, plus media files lying next to them (taken as season 1).
    SingleSeries {
        seasons: Vec<DirectoryNode>,
        loose_episodes: Vec<DirectoryNode>,
    },
    /// Episodes directly inside this folder.
    SingleSeason { episodes: Vec<DirectoryNode> },
    /// Every child folder is its own series root.
    MultiSeries { series: Vec<DirectoryNode> },
}

impl SeriesLayout {
    pub fn kind(&self) -> StructureKind {
        match self {
            SeriesLayout::SingleSeries { .. } => StructureKind::SingleSeries,
            SeriesLayout::SingleSeason { .. } => StructureKind::SingleSeason,
            SeriesLayout::MultiSeries { .. } => StructureKind::MultiSeries,
        }
    }
}

/// Fetch the listing at `url` and classify it. `None` when the listing is
/// unavailable or was already fetched in this job.
pub async fn detect_structure(fetcher: &mut Fetcher, url: &Url, root: &Url) -> Option<SeriesLayout> {
    let body = fetcher.fetch(url).await?;
    let html = String::from_utf8_lossy(&body);
    Some(classify_children(parse_listing(&html, url, root)))
}

/// One-level lookahead over a listing's children.
pub fn classify_children(nodes: Vec<DirectoryNode>) -> SeriesLayout {
    let (dirs, files): (Vec<_>, Vec<_>) = nodes.into_iter().partition(|n| n.is_directory);

    if dirs.iter().any(|d| is_season_folder(&d.name)) {
        let (seasons, others): (Vec<_>, Vec<_>) = dirs.into_iter().partition(|d| is_season_folder(&d.name));
        for other in others {
            debug!("Skipping non-season folder {} next to season folders", other.url);
        }
        return SeriesLayout::SingleSeries { seasons, loose_episodes: files };
    }

    if !files.is_empty() {
        return SeriesLayout::SingleSeason { episodes: files };
    }

    SeriesLayout::MultiSeries { series: dirs }
}

/// Raw (still percent-encoded) path segment naming the series that `url` belongs to.
///
/// The segment right after a known TV marker wins; otherwise the nearest
/// segment that is not a season folder.
pub fn series_segment_from_path(url: &Url) -> String {
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();

    let marker = segments
        .iter()
        .rposition(|s| TV_PATH_MARKERS.contains(&percent_decode(s).to_lowercase().trim()));
    if let Some(i) = marker {
        if let Some(next) = segments.get(i + 1) {
            if !is_season_folder(next) {
                return next.to_string();
            }
        }
    }

    segments
        .iter()
        .rev()
        .find(|s| !is_season_folder(s))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Raw last segment of `url` when it names a season, else empty.
pub fn season_segment_from_path(url: &Url) -> String {
    url.path()
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .filter(|s| is_season_folder(s))
        .map(|s| s.to_string())
        .unwrap_or_default()
}
