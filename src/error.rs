use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping already in progress")]
    AlreadyRunning,

    #[error("Root listing unreachable: {0}")]
    RootUnreachable(String),

    #[error("Could not classify media file: {0}")]
    Classification(String),

    #[error("Spreadsheet export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Crawl task failed: {0}")]
    Task(String),
}
