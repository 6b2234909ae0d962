use std::collections::{BTreeMap, HashMap};
use serde::Serialize;
use crate::records::EpisodeRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub series_title: String,
    pub series_year: String,
    pub season_count: usize,
    pub episode_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonSummary {
    pub series_title: String,
    pub series_year: String,
    pub season_number: u32,
    pub season_title: String,
    pub episode_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub series: Vec<SeriesSummary>,
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Default)]
struct SeriesGroup {
    seasons: BTreeMap<u32, (String, usize)>,
    episodes: usize,
}

/// Group episodes per series and per season.
///
/// Series keep the order in which they were first crawled; seasons are
/// sorted by number within their series.
pub fn summarize(episodes: &[EpisodeRecord]) -> CatalogSummary {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), SeriesGroup> = HashMap::new();

    for episode in episodes {
        let key = (episode.series_title.clone(), episode.series_year.clone());
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            SeriesGroup::default()
        });
        group.episodes += 1;
        group
            .seasons
            .entry(episode.season_number)
            .or_insert_with(|| (episode.season_title.clone(), 0))
            .1 += 1;
    }

    let mut summary = CatalogSummary::default();
    for (title, year) in order {
        let Some(group) = groups.remove(&(title.clone(), year.clone())) else { continue };
        summary.series.push(SeriesSummary {
            series_title: title.clone(),
            series_year: year.clone(),
            season_count: group.seasons.len(),
            episode_count: group.episodes,
        });
        for (season_number, (season_title, episode_count)) in group.seasons {
            summary.seasons.push(SeasonSummary {
                series_title: title.clone(),
                series_year: year.clone(),
                season_number,
                season_title,
                episode_count,
            });
        }
    }
    summary
}
