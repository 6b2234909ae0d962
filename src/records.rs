use serde::{Deserialize, Serialize};

/// Which strategy a crawl job runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    #[default]
    Movies,
    Series,
}

impl std::str::FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movies" | "movie" => Ok(CrawlMode::Movies),
            "series" | "shows" | "tv" => Ok(CrawlMode::Series),
            other => Err(format!("unknown crawl mode '{}'", other)),
        }
    }
}

/// A movie found on the listing server.
///
/// Everything after `source_url` is left empty here and filled later by the
/// enrichment stage, which works on persisted records.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MediaRecord {
    pub title: String,
    pub year: String,
    pub source_url: String,
    pub plot: String,
    pub rating: String,
    pub image_url: String,
    pub duration: String,
    pub external_id: String,
}

impl MediaRecord {
    pub fn new(title: String, year: String, source_url: String) -> Self {
        Self {
            title,
            year,
            source_url,
            ..Default::default()
        }
    }

    /// "Title (Year)", used as the current-item label in progress snapshots.
    pub fn label(&self) -> String {
        display_label(&self.title, &self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EpisodeRecord {
    pub series_title: String,
    pub series_year: String,
    pub season_number: u32,
    pub season_title: String,
    pub episode_number: u32,
    pub episode_title: String,
    pub source_url: String,
}

impl EpisodeRecord {
    pub fn label(&self) -> String {
        format!(
            "{} S{:02}E{:02} - {}",
            self.series_title, self.season_number, self.episode_number, self.episode_title
        )
    }
}

/// A media file that matched the allow-list but could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailureRecord {
    pub title: String,
    pub year: String,
    pub url: String,
    pub error: String,
}

pub fn display_label(title: &str, year: &str) -> String {
    if year.is_empty() {
        format!("{} (Unknown Year)", title)
    } else {
        format!("{} ({})", title, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_mode_parses_aliases() {
        assert_eq!("movies".parse::<CrawlMode>(), Ok(CrawlMode::Movies));
        assert_eq!(" Series ".parse::<CrawlMode>(), Ok(CrawlMode::Series));
        assert_eq!("tv".parse::<CrawlMode>(), Ok(CrawlMode::Series));
        assert!("music".parse::<CrawlMode>().is_err());
    }

    #[test]
    fn media_record_placeholders_are_empty() {
        let record = MediaRecord::new("Heat".into(), "1995".into(), "http://h/Heat.mkv".into());
        assert!(record.plot.is_empty());
        assert!(record.rating.is_empty());
        assert!(record.external_id.is_empty());
        assert_eq!(record.label(), "Heat (1995)");
    }

    #[test]
    fn label_without_year() {
        assert_eq!(display_label("file", ""), "file (Unknown Year)");
    }

    #[test]
    fn crawl_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CrawlMode::Series).unwrap(), "\"series\"");
    }
}
