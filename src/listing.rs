use std::collections::HashSet;
use std::sync::LazyLock;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

/// Extensions (lowercase, no dot) that mark a leaf media file.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "m4v", "webm", "mpg", "mpeg",
];

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// One child entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub url: Url,
    pub is_directory: bool,
    /// Percent-decoded last path segment, without the trailing slash.
    pub name: String,
}

/// Extract the sub-directories and media files linked from an autoindex page.
///
/// `base` is the URL the page was served from, `root` the top of the crawl.
/// Links that leave the root subtree, point back at the page itself, carry a
/// query string, or name a non-media file are dropped. Duplicate links (icon
/// plus name columns) are reported once, in first-seen order.
pub fn parse_listing(html: &str, base: &Url, root: &Url) -> Vec<DirectoryNode> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else { continue };
        let href = href.trim();
        if is_ignored_href(href) {
            continue;
        }

        let Ok(mut url) = base.join(href) else {
            debug!("Unresolvable link '{}' on {}", href, base);
            continue;
        };
        url.set_fragment(None);

        if url.query().is_some() || !is_within(root, &url) || same_location(base, &url) {
            continue;
        }

        let is_directory = url.path().ends_with('/');
        if !is_directory && !is_video_file(url.path()) {
            continue;
        }

        if !seen.insert(url.to_string()) {
            continue;
        }

        let name = folder_name(&url);
        nodes.push(DirectoryNode { url, is_directory, name });
    }

    nodes
}

fn is_ignored_href(href: &str) -> bool {
    if href.is_empty() || href == ".." || href == "../" || href == "." || href == "./" {
        return true;
    }
    if href.starts_with('?') || href.starts_with('#') {
        return true;
    }
    let lower = href.to_lowercase();
    lower.starts_with("mailto:") || lower.starts_with("javascript:") || lower.starts_with("data:")
}

/// True when `url` is strictly below `root` on the same origin.
pub fn is_within(root: &Url, url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if url.origin() != root.origin() {
        return false;
    }
    let root_path = root.path();
    url.path().len() > root_path.len() && url.path().starts_with(root_path)
}

fn same_location(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && a.path() == b.path()
}

/// Case-insensitive check of the text after the last `.` of the last segment.
pub fn is_video_file(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            VIDEO_EXTENSIONS.iter().any(|e| *e == ext)
        }
        None => false,
    }
}

/// Last non-empty path segment, still percent-encoded. Empty for the host root.
pub fn last_segment(url: &Url) -> &str {
    url.path().trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Decoded last non-empty path segment, "Unknown" for the host root.
pub fn folder_name(url: &Url) -> String {
    match last_segment(url) {
        "" => "Unknown".to_string(),
        raw => percent_decode(raw),
    }
}

/// Percent-decode, leaving the input untouched when it does not decode to UTF-8.
pub fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
