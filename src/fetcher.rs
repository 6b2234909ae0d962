use std::collections::HashSet;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Url;
use tracing::{debug, warn};
use crate::config::FetchSettings;
use crate::error::AppError;

/// Deduplicating GET client for listing pages.
///
/// One fetcher lives for exactly one crawl job. Its `visited` set is the
/// cycle breaker: a URL that was already requested yields `None`, the same
/// answer a failed request gives, so callers never descend twice.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    visited: HashSet<String>,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.6"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            visited: HashSet::new(),
        })
    }

    /// GET `url` once per job. Network errors, timeouts and non-2xx statuses
    /// are logged and reported as `None`.
    pub async fn fetch(&mut self, url: &Url) -> Option<Bytes> {
        let key = visit_key(url);
        if !self.visited.insert(key) {
            debug!("Already fetched {}, skipping", url);
            return None;
        }

        let resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Error fetching {}: {}", url, e);
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!("Error fetching {}: HTTP {}", url, status);
            return None;
        }

        match resp.bytes().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Error reading body of {}: {}", url, e);
                None
            }
        }
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_key_ignores_fragment() {
        let a = Url::parse("http://host/a/#top").unwrap();
        let b = Url::parse("http://host/a/").unwrap();
        assert_eq!(visit_key(&a), visit_key(&b));
    }

    #[tokio::test]
    async fn unreachable_host_yields_none_and_counts_as_visited() {
        let settings = FetchSettings {
            timeout: std::time::Duration::from_millis(500),
            ..FetchSettings::default()
        };
        let mut fetcher = Fetcher::new(&settings).unwrap();
        // Port 9 (discard) on localhost is closed in any sane test environment.
        let url = Url::parse("http://127.0.0.1:9/listing/").unwrap();
        assert!(fetcher.fetch(&url).await.is_none());
        assert_eq!(fetcher.visited_count(), 1);

        // A retry of the same URL is answered from the visited set.
        let with_fragment = Url::parse("http://127.0.0.1:9/listing/#top").unwrap();
        assert!(fetcher.fetch(&with_fragment).await.is_none());
        assert_eq!(fetcher.visited_count(), 1);
    }
}
