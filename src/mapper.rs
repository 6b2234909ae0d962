pub mod error;
pub mod config;
pub mod records;
pub mod fetcher;
pub mod listing;
pub mod identification;
pub mod structure;
pub mod movie_crawler;
pub mod series_crawler;
pub mod state;
pub mod tasks;
pub mod job;
pub mod aggregate;
pub mod export;

pub use config::{CrawlOptions, FetchSettings, Settings};
pub use error::AppError;
pub use job::CrawlJob;
pub use records::{CrawlMode, EpisodeRecord, FailureRecord, MediaRecord};
pub use state::{JobState, JobStatus};
