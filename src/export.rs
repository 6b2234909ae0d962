use rust_xlsxwriter::{Format, Workbook, Worksheet};
use crate::aggregate::summarize;
use crate::error::AppError;
use crate::records::{CrawlMode, FailureRecord};
use crate::state::JobState;

const MOVIE_TYPE_ID: f64 = 1.0;
const SERIES_TYPE_ID: f64 = 2.0;

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

/// Build the workbook for the job's results. `None` when nothing succeeded.
pub fn export_workbook(state: &JobState) -> Result<Option<Vec<u8>>, AppError> {
    if state.result_count() == 0 {
        return Ok(None);
    }

    let mut workbook = Workbook::new();
    match state.mode {
        CrawlMode::Movies => write_movies(&mut workbook, state)?,
        CrawlMode::Series => write_series(&mut workbook, state)?,
    }
    write_failures(&mut workbook, &state.failures)?;

    Ok(Some(workbook.save_to_buffer()?))
}

/// `movies_2024-05-01.xlsx` / `series_2024-05-01.xlsx`, local date.
pub fn export_file_name(mode: CrawlMode) -> String {
    let prefix = match mode {
        CrawlMode::Movies => "movies",
        CrawlMode::Series => "series",
    };
    format!("{}_{}.xlsx", prefix, chrono::Local::now().format("%Y-%m-%d"))
}

fn write_movies(workbook: &mut Workbook, state: &JobState) -> Result<(), AppError> {
    let headers = [
        "movie_title", "release_year", "release_date", "download_url", "plot", "duration",
        "rating", "image_url", "trailer", "imdb_id", "type_id", "category_id", "download_count",
    ];
    let rows = state.movies.iter().map(|m| {
        vec![
            Cell::Text(&m.title),
            Cell::Text(&m.year),
            Cell::Empty,
            Cell::Text(&m.source_url),
            Cell::Text(&m.plot),
            Cell::Text(&m.duration),
            Cell::Text(&m.rating),
            Cell::Text(&m.image_url),
            Cell::Empty,
            Cell::Text(&m.external_id),
            Cell::Number(MOVIE_TYPE_ID),
            Cell::Empty,
            Cell::Number(0.0),
        ]
    });
    write_sheet(workbook.add_worksheet(), "Movies", &headers, rows)
}

fn write_series(workbook: &mut Workbook, state: &JobState) -> Result<(), AppError> {
    let summary = summarize(&state.episodes);

    let headers = [
        "serie_title", "release_year", "total_seasons", "total_episodes", "description",
        "rating", "image_url", "trailer", "type_id", "tmdb_id",
    ];
    let rows = summary.series.iter().map(|s| {
        vec![
            Cell::Text(&s.series_title),
            Cell::Text(&s.series_year),
            Cell::Number(s.season_count as f64),
            Cell::Number(s.episode_count as f64),
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Number(SERIES_TYPE_ID),
            Cell::Empty,
        ]
    });
    write_sheet(workbook.add_worksheet(), "Serie", &headers, rows)?;

    let headers = ["serie_title", "release_year", "season_number", "season_title", "episode_count"];
    let rows = summary.seasons.iter().map(|s| {
        vec![
            Cell::Text(&s.series_title),
            Cell::Text(&s.series_year),
            Cell::Number(s.season_number as f64),
            Cell::Text(&s.season_title),
            Cell::Number(s.episode_count as f64),
        ]
    });
    write_sheet(workbook.add_worksheet(), "Season", &headers, rows)?;

    let headers = [
        "serie_title", "release_year", "season_number", "season_title", "episode_number",
        "episode_title", "download_url",
    ];
    let rows = state.episodes.iter().map(|e| {
        vec![
            Cell::Text(&e.series_title),
            Cell::Text(&e.series_year),
            Cell::Number(e.season_number as f64),
            Cell::Text(&e.season_title),
            Cell::Number(e.episode_number as f64),
            Cell::Text(&e.episode_title),
            Cell::Text(&e.source_url),
        ]
    });
    write_sheet(workbook.add_worksheet(), "Episodes", &headers, rows)
}

fn write_failures(workbook: &mut Workbook, failures: &[FailureRecord]) -> Result<(), AppError> {
    let rows = failures.iter().map(|f| {
        vec![
            Cell::Text(&f.title),
            Cell::Text(&f.year),
            Cell::Text(&f.url),
            Cell::Text(&f.error),
        ]
    });
    write_sheet(workbook.add_worksheet(), "Failures", &["title", "year", "url", "error"], rows)
}

fn write_sheet<'a>(
    sheet: &mut Worksheet,
    name: &str,
    headers: &[&str],
    rows: impl Iterator<Item = Vec<Cell<'a>>>,
) -> Result<(), AppError> {
    sheet.set_name(name)?;

    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in rows.enumerate() {
        let row_num = i as u32 + 1;
        for (col, cell) in row.into_iter().enumerate() {
            match cell {
                Cell::Text(text) if !text.is_empty() => {
                    sheet.write_string(row_num, col as u16, text)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row_num, col as u16, n)?;
                }
                Cell::Text(_) | Cell::Empty => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EpisodeRecord, MediaRecord};

    #[test]
    fn empty_results_export_nothing() {
        let state = JobState {
            failures: vec![FailureRecord {
                title: "x".into(),
                year: String::new(),
                url: "http://h/x.mkv".into(),
                error: "bad".into(),
            }],
            ..Default::default()
        };
        assert!(export_workbook(&state).unwrap().is_none());
    }

    #[test]
    fn movie_export_is_a_zip_container() {
        let state = JobState {
            movies: vec![MediaRecord::new("Heat".into(), "1995".into(), "http://h/Heat.mkv".into())],
            ..Default::default()
        };
        let bytes = export_workbook(&state).unwrap().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn series_export_is_a_zip_container() {
        let state = JobState {
            mode: CrawlMode::Series,
            episodes: vec![EpisodeRecord {
                series_title: "Dark".into(),
                series_year: "2017".into(),
                season_number: 1,
                season_title: "Season 1".into(),
                episode_number: 1,
                episode_title: "Secrets".into(),
                source_url: "http://h/Dark/S1/01.mkv".into(),
            }],
            ..Default::default()
        };
        let bytes = export_workbook(&state).unwrap().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn file_name_carries_mode_and_date() {
        let name = export_file_name(CrawlMode::Series);
        assert!(name.starts_with("series_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "series_2024-01-01.xlsx".len());
    }
}
