use std::sync::LazyLock;
use regex::Regex;
use serde::Serialize;
use crate::listing::percent_decode;

// Movie cascade. Paths are matched after percent-decoding.
static FOLDER_PAREN_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/([^/]+)\((\d{4})\)/[^/]*$").unwrap());

static FOLDER_DOTTED_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/([^/]+)\.(\d{4})\.[^/]*/[^/]*$").unwrap());

static FILE_DOTTED_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\.(\d{4})\.").unwrap());

static NAME_PAREN_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\((\d{4})\)$").unwrap());

static NAME_DOTTED_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\.(\d{4})$").unwrap());

static FOUR_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

static DOTTED_YEAR_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\d{4}\..+$").unwrap());

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[^/.]+$").unwrap());

// Series cascade.
static SERIES_PAREN_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap());

static SEASON_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(?:^|[\s._\-\[(])s(\d{1,3})(?:$|[\s._\-\])])").unwrap());

static SEASON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)season[\s._-]?(\d+)").unwrap());

// Whole folder name is a season: `S2`, `s01`, `Season 3`, `season_04`.
static SEASON_FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:s\d{1,3}|season[\s._-]?\d+)$").unwrap());

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static SEASON_EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)s(\d{1,3})\s*e(\d{1,4})(.*)$").unwrap());

static CROSS_EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})x(\d{1,3})\b(.*)$").unwrap());

static EPISODE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\be(\d{1,4})\b(.*)$").unwrap());

static EPISODE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bep(?:isode)?[\s._-]*(\d{1,4})\b(.*)$").unwrap());

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})[\s._-]+(.*)$").unwrap());

static BARE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})$").unwrap());

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(2160p|1080p|720p|480p|4k|bluray|blu-ray|web-dl|webrip|web|hdtv|dvdrip|x264|x265|h264|h265|hevc|aac|dts|remux)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovieRule {
    /// `.../Name (YYYY)/file`
    FolderYearInParens,
    /// `.../Name.YYYY.tags/file`
    FolderDottedYear,
    /// `Name.YYYY.tags.ext`
    FileDottedYear,
    /// `Name (YYYY).ext`
    FilenameYearInParens,
    /// `Name.YYYY.ext`
    FilenameDottedYear,
    /// Any 4-digit run in the path; title from the parent folder.
    PathYearFallback,
    FilenameOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieGuess {
    pub title: String,
    pub year: String,
    pub rule: MovieRule,
}

struct MovieInput {
    /// Decoded path of the file, e.g. `/Data/Heat (1995)/Heat.mkv`.
    path: String,
    /// Decoded filename with its extension removed.
    stem: String,
}

type MovieExtractor = fn(&MovieInput) -> Option<(String, String)>;

/// Ordered, first match wins.
static MOVIE_RULES: &[(MovieRule, MovieExtractor)] = &[
    (MovieRule::FolderYearInParens, |input| title_and_year(&FOLDER_PAREN_YEAR_RE, &input.path)),
    (MovieRule::FolderDottedYear, |input| title_and_year(&FOLDER_DOTTED_YEAR_RE, &input.path)),
    (MovieRule::FileDottedYear, |input| title_and_year(&FILE_DOTTED_YEAR_RE, &input.stem)),
    (MovieRule::FilenameYearInParens, |input| title_and_year(&NAME_PAREN_YEAR_RE, &input.stem)),
    (MovieRule::FilenameDottedYear, |input| title_and_year(&NAME_DOTTED_YEAR_RE, &input.stem)),
    (MovieRule::PathYearFallback, path_year_fallback),
];

/// Guess `{title, year}` for a movie file from its name and the path it was found under.
///
/// `folder_path` is the URL path of the file (encoded or not); the host is
/// deliberately excluded so a port number is never mistaken for a year.
pub fn infer_movie_info(filename: &str, folder_path: &str) -> MovieGuess {
    let filename = percent_decode(filename);
    let input = MovieInput {
        path: percent_decode(folder_path),
        stem: strip_extension(&filename),
    };

    MOVIE_RULES
        .iter()
        .find_map(|(rule, extract)| {
            extract(&input).map(|(title, year)| MovieGuess { title, year, rule: *rule })
        })
        .unwrap_or_else(|| MovieGuess {
            title: tidy_title(&input.stem),
            year: String::new(),
            rule: MovieRule::FilenameOnly,
        })
}

fn title_and_year(re: &Regex, haystack: &str) -> Option<(String, String)> {
    let caps = re.captures(haystack)?;
    let title = tidy_title(&caps[1]);
    if title.is_empty() {
        return None;
    }
    Some((title, caps[2].to_string()))
}

fn path_year_fallback(input: &MovieInput) -> Option<(String, String)> {
    let year = FOUR_DIGITS_RE.find(&input.path)?.as_str().to_string();
    let segments: Vec<&str> = input.path.split('/').collect();
    let folder = segments.len().checked_sub(2).map(|i| segments[i]).unwrap_or("");
    let title = tidy_title(&DOTTED_YEAR_SUFFIX_RE.replace(folder, ""));
    if title.is_empty() {
        return None;
    }
    Some((title, year))
}

pub fn strip_extension(filename: &str) -> String {
    EXTENSION_RE.replace(filename, "").into_owned()
}

/// Dots become spaces, runs of whitespace collapse.
fn tidy_title(raw: &str) -> String {
    raw.replace('.', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeasonRule {
    /// `S2`, `Show S02`
    SeasonToken,
    /// `Season 2`, `season2`
    SeasonWord,
    /// Any digit run in the season folder.
    AnyDigits,
    /// `S02E05` / `2x05` in the episode filename.
    EpisodeMarker,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EpisodeRule {
    SeasonEpisode,
    CrossFormat,
    EpisodeToken,
    EpisodeWord,
    LeadingNumber,
    BareNumber,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeGuess {
    pub series_title: String,
    pub series_year: String,
    pub season_number: u32,
    pub season_title: String,
    pub episode_number: u32,
    pub episode_title: String,
    pub season_rule: SeasonRule,
    pub episode_rule: EpisodeRule,
}

type SeasonExtractor = fn(&str) -> Option<u32>;

static SEASON_RULES: &[(SeasonRule, SeasonExtractor)] = &[
    (SeasonRule::SeasonToken, |folder| first_number(&SEASON_TOKEN_RE, folder)),
    (SeasonRule::SeasonWord, |folder| first_number(&SEASON_WORD_RE, folder)),
    (SeasonRule::AnyDigits, |folder| DIGITS_RE.find(folder).and_then(|m| positive(m.as_str()))),
];

type EpisodeExtractor = fn(&str) -> Option<(u32, String)>;

static EPISODE_RULES: &[(EpisodeRule, EpisodeExtractor)] = &[
    (EpisodeRule::SeasonEpisode, |stem| numbered(&SEASON_EPISODE_RE, stem, 2, 3)),
    (EpisodeRule::CrossFormat, |stem| numbered(&CROSS_EPISODE_RE, stem, 2, 3)),
    (EpisodeRule::EpisodeToken, |stem| numbered(&EPISODE_TOKEN_RE, stem, 1, 2)),
    (EpisodeRule::EpisodeWord, |stem| numbered(&EPISODE_WORD_RE, stem, 1, 2)),
    (EpisodeRule::LeadingNumber, |stem| numbered(&LEADING_NUMBER_RE, stem, 1, 2)),
    (EpisodeRule::BareNumber, |stem| numbered(&BARE_NUMBER_RE, stem, 1, 0)),
];

/// Guess series, season and episode from the three path levels that hold them.
///
/// Any argument may be percent-encoded. An empty `season_folder` means the
/// episodes sit directly in the series folder.
pub fn infer_episode_info(series_raw: &str, season_folder: &str, episode_filename: &str) -> EpisodeGuess {
    let (series_title, series_year) = infer_series_title(series_raw);
    let season_folder = percent_decode(season_folder);
    let stem = strip_extension(&percent_decode(episode_filename));

    let (season_number, season_rule) = SEASON_RULES
        .iter()
        .find_map(|(rule, extract)| extract(&season_folder).map(|n| (n, *rule)))
        .or_else(|| season_from_episode_marker(&stem).map(|n| (n, SeasonRule::EpisodeMarker)))
        .unwrap_or((1, SeasonRule::Default));

    let (episode_number, trailing, episode_rule) = EPISODE_RULES
        .iter()
        .find_map(|(rule, extract)| extract(&stem).map(|(n, rest)| (n, rest, *rule)))
        .unwrap_or((1, String::new(), EpisodeRule::Default));

    EpisodeGuess {
        series_title,
        series_year,
        season_number,
        season_title: format!("Season {}", season_number),
        episode_number,
        episode_title: episode_title(&trailing, episode_number),
        season_rule,
        episode_rule,
    }
}

/// `{title, year}` for a series folder: `Name (YYYY)` first, then the first
/// 4-digit run is taken as the year and cut out of the title.
pub fn infer_series_title(raw: &str) -> (String, String) {
    let decoded = percent_decode(raw);
    let decoded = decoded.trim_end_matches('/');

    if let Some(caps) = SERIES_PAREN_YEAR_RE.captures(decoded) {
        let title = tidy_title(&caps[1]);
        if !title.is_empty() {
            return (title, caps[2].to_string());
        }
    }

    if let Some(m) = FOUR_DIGITS_RE.find(decoded) {
        let mut rest = String::with_capacity(decoded.len());
        rest.push_str(&decoded[..m.start()]);
        rest.push_str(&decoded[m.end()..]);
        let title = tidy_series_remainder(&rest);
        if !title.is_empty() {
            return (title, m.as_str().to_string());
        }
    }

    (tidy_title(decoded), String::new())
}

/// True for folder names that are nothing but a season marker (`S1`, `Season 01`).
///
/// Series folders that merely mention seasons (`The Office S1-9`) do not count.
pub fn is_season_folder(name: &str) -> bool {
    let name = percent_decode(name);
    SEASON_FOLDER_RE.is_match(name.trim())
}

fn season_from_episode_marker(stem: &str) -> Option<u32> {
    first_number(&SEASON_EPISODE_RE, stem).or_else(|| first_number(&CROSS_EPISODE_RE, stem))
}

fn first_number(re: &Regex, haystack: &str) -> Option<u32> {
    re.captures(haystack).and_then(|caps| positive(&caps[1]))
}

/// Episode number from group `num`, trailing text from group `rest` (0 = none).
fn numbered(re: &Regex, stem: &str, num: usize, rest: usize) -> Option<(u32, String)> {
    let caps = re.captures(stem)?;
    let n = positive(caps.get(num)?.as_str())?;
    let trailing = if rest == 0 {
        String::new()
    } else {
        caps.get(rest).map(|m| m.as_str().to_string()).unwrap_or_default()
    };
    Some((n, trailing))
}

/// Numbers below 1 count as unrecoverable.
fn positive(digits: &str) -> Option<u32> {
    digits.parse::<u32>().ok().filter(|n| *n >= 1)
}

fn episode_title(trailing: &str, episode_number: u32) -> String {
    let mut title = trailing.replace(['.', '_'], " ");
    if let Some(m) = QUALITY_RE.find(&title) {
        title.truncate(m.start());
    }
    let title = title
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | ':' | '[' | ']' | '(' | ')'))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() || title.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        format!("Episode {}", episode_number)
    } else {
        title
    }
}

fn tidy_series_remainder(rest: &str) -> String {
    let cleaned = rest.replace("()", " ").replace("[]", " ");
    tidy_title(&cleaned)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | ',' | '(' | ')'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_year_in_parens_wins_over_filename() {
        let guess = infer_movie_info(
            "Inception.2010.1080p.mkv",
            "/Data/movies/Inception%20(2010)/Inception.2010.1080p.mkv",
        );
        assert_eq!(guess.title, "Inception");
        assert_eq!(guess.year, "2010");
        assert_eq!(guess.rule, MovieRule::FolderYearInParens);
    }

    #[test]
    fn no_year_anywhere_falls_back_to_filename() {
        let guess = infer_movie_info("file.mkv", "/Data/Random/file.mkv");
        assert_eq!(guess.title, "file");
        assert_eq!(guess.year, "");
        assert_eq!(guess.rule, MovieRule::FilenameOnly);
    }

    #[test]
    fn dotted_folder() {
        let guess = infer_movie_info("movie.mkv", "/m/The.Matrix.1999.1080p.BluRay/movie.mkv");
        assert_eq!(guess.title, "The Matrix");
        assert_eq!(guess.year, "1999");
        assert_eq!(guess.rule, MovieRule::FolderDottedYear);
    }

    #[test]
    fn dotted_folder_takes_the_last_year() {
        let guess = infer_movie_info("a.mkv", "/m/Blade.Runner.2049.2017.2160p/a.mkv");
        assert_eq!(guess.title, "Blade Runner 2049");
        assert_eq!(guess.year, "2017");
    }

    #[test]
    fn dotted_filename_with_tags() {
        let guess = infer_movie_info("Heat.1995.1080p.BluRay.mkv", "/m/Random/Heat.1995.1080p.BluRay.mkv");
        assert_eq!(guess.title, "Heat");
        assert_eq!(guess.year, "1995");
        assert_eq!(guess.rule, MovieRule::FileDottedYear);
    }

    #[test]
    fn filename_year_in_parens() {
        let guess = infer_movie_info("Alien (1979).mp4", "/m/Random/Alien%20(1979).mp4");
        assert_eq!(guess.title, "Alien");
        assert_eq!(guess.year, "1979");
        assert_eq!(guess.rule, MovieRule::FilenameYearInParens);
    }

    #[test]
    fn filename_dotted_year_at_end() {
        let guess = infer_movie_info("Jaws.1975.avi", "/m/Random/Jaws.1975.avi");
        assert_eq!(guess.title, "Jaws");
        assert_eq!(guess.year, "1975");
        assert_eq!(guess.rule, MovieRule::FilenameDottedYear);
    }

    #[test]
    fn path_year_fallback_uses_parent_folder() {
        let guess = infer_movie_info("movie.mkv", "/m/2019/Parasite/movie.mkv");
        assert_eq!(guess.year, "2019");
        assert_eq!(guess.title, "Parasite");
        assert_eq!(guess.rule, MovieRule::PathYearFallback);
    }

    #[test]
    fn encoded_filename_is_decoded() {
        let guess = infer_movie_info("My%20Film.mkv", "/m/Misc/My%20Film.mkv");
        assert_eq!(guess.title, "My Film");
        assert_eq!(guess.rule, MovieRule::FilenameOnly);
    }

    #[test]
    fn explicit_markers_give_season_and_episode() {
        let guess = infer_episode_info("Show", "S1", "S01E03 - The Beginning.mkv");
        assert_eq!(guess.season_number, 1);
        assert_eq!(guess.episode_number, 3);
        assert_eq!(guess.episode_title, "The Beginning");
        assert_eq!(guess.season_rule, SeasonRule::SeasonToken);
        assert_eq!(guess.episode_rule, EpisodeRule::SeasonEpisode);
    }

    #[test]
    fn bare_number_episode() {
        let guess = infer_episode_info("Show", "Season 2", "03.mkv");
        assert_eq!(guess.season_number, 2);
        assert_eq!(guess.season_title, "Season 2");
        assert_eq!(guess.episode_number, 3);
        assert_eq!(guess.episode_title, "Episode 3");
        assert_eq!(guess.episode_rule, EpisodeRule::BareNumber);
    }

    #[test]
    fn cross_format_episode() {
        let guess = infer_episode_info("Show", "Season%2001", "1x05 Pilot.mkv");
        assert_eq!(guess.season_number, 1);
        assert_eq!(guess.episode_number, 5);
        assert_eq!(guess.episode_title, "Pilot");
        assert_eq!(guess.episode_rule, EpisodeRule::CrossFormat);
    }

    #[test]
    fn e_token_and_episode_word() {
        let e = infer_episode_info("Show", "S2", "E07 - Reunion.mp4");
        assert_eq!((e.episode_number, e.episode_title.as_str()), (7, "Reunion"));
        assert_eq!(e.episode_rule, EpisodeRule::EpisodeToken);

        let w = infer_episode_info("Show", "S2", "Episode 12.mp4");
        assert_eq!((w.episode_number, w.episode_title.as_str()), (12, "Episode 12"));
        assert_eq!(w.episode_rule, EpisodeRule::EpisodeWord);
    }

    #[test]
    fn leading_number_with_title() {
        let guess = infer_episode_info("Show", "S1", "04 - The Heist.mkv");
        assert_eq!(guess.episode_number, 4);
        assert_eq!(guess.episode_title, "The Heist");
        assert_eq!(guess.episode_rule, EpisodeRule::LeadingNumber);
    }

    #[test]
    fn numeric_trailing_text_is_not_a_title() {
        let guess = infer_episode_info("Show", "S1", "S01E02 - 2.mkv");
        assert_eq!(guess.episode_title, "Episode 2");
    }

    #[test]
    fn quality_tags_are_cut_from_episode_titles() {
        let guess = infer_episode_info("Show", "S1", "Show.S01E02.Gone.Fishing.1080p.WEB.mkv");
        assert_eq!(guess.episode_title, "Gone Fishing");
        let bare = infer_episode_info("Show", "S1", "Show.S01E02.1080p.WEB.mkv");
        assert_eq!(bare.episode_title, "Episode 2");
    }

    #[test]
    fn season_falls_back_to_filename_marker_then_default() {
        let marked = infer_episode_info("Show", "", "Show.S03E01.mkv");
        assert_eq!(marked.season_number, 3);
        assert_eq!(marked.season_rule, SeasonRule::EpisodeMarker);

        let unmarked = infer_episode_info("Show", "", "Pilot.mkv");
        assert_eq!(unmarked.season_number, 1);
        assert_eq!(unmarked.season_rule, SeasonRule::Default);
        assert_eq!(unmarked.episode_number, 1);
        assert_eq!(unmarked.episode_title, "Episode 1");
        assert_eq!(unmarked.episode_rule, EpisodeRule::Default);
    }

    #[test]
    fn season_zero_is_unrecoverable() {
        let guess = infer_episode_info("Show", "Season 0", "01.mkv");
        assert_eq!(guess.season_number, 1);
    }

    #[test]
    fn any_digit_run_is_the_last_season_rule() {
        let guess = infer_episode_info("Show", "Staffel 4", "01.mkv");
        assert_eq!(guess.season_number, 4);
        assert_eq!(guess.season_rule, SeasonRule::AnyDigits);
    }

    #[test]
    fn series_title_with_year_in_parens() {
        assert_eq!(
            infer_series_title("Breaking%20Bad%20(2008)"),
            ("Breaking Bad".to_string(), "2008".to_string())
        );
    }

    #[test]
    fn series_title_year_fallback_removes_the_year() {
        assert_eq!(infer_series_title("Dark.2017"), ("Dark".to_string(), "2017".to_string()));
        assert_eq!(infer_series_title("Chernobyl"), ("Chernobyl".to_string(), String::new()));
    }

    #[test]
    fn four_digit_only_series_keeps_its_name() {
        assert_eq!(infer_series_title("1883"), ("1883".to_string(), String::new()));
    }

    #[test]
    fn season_folder_detection() {
        assert!(is_season_folder("Season 1"));
        assert!(is_season_folder("season2"));
        assert!(is_season_folder("S01"));
        assert!(is_season_folder("Season%2003"));
        assert!(is_season_folder("season_04"));
        assert!(!is_season_folder("Breaking Bad"));
        assert!(!is_season_folder("Specials 2"));
        assert!(!is_season_folder("Sons of Anarchy"));
    }

    #[test]
    fn series_folders_mentioning_seasons_are_not_season_folders() {
        assert!(!is_season_folder("Show S02"));
        assert!(!is_season_folder("The Office S1-9"));
        assert!(!is_season_folder("The%20Office%20S1-9"));
        assert!(!is_season_folder("Dark Season 1-3 Complete"));
    }
}
