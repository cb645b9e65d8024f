//! The crawl data model (spec.md §3): tagged records, not a loose mapping.

use serde_derive::{Deserialize, Serialize};
use url::Url;

/// A unit of work dispatched from the Coordinator to exactly one Worker.
/// Created by the Coordinator, consumed by one Worker, never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub url: Url,
    pub depth: u16,
}

impl Job {
    pub fn new(url: Url, depth: u16) -> Job {
        Job { url, depth }
    }
}

/// The only five outcomes a crawl attempt may report (spec.md §7). There is
/// deliberately no catch-all variant: every Worker Pipeline exit path maps to
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Blocked,
    RobotsBlocked,
    RequestError,
    ParseError,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Blocked => "blocked",
            Status::RobotsBlocked => "robots_blocked",
            Status::RequestError => "request_error",
            Status::ParseError => "parse_error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produced by a Worker, consumed by the Coordinator and the Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: Url,
    /// Whitespace-collapsed, truncated to 200 chars. Empty string outside of
    /// `Status::Success`/non-HTML content.
    pub title: String,
    pub content_length: usize,
    pub status: Status,
    pub depth: u16,
    /// Lowercase host, cached here so the Store doesn't need to re-parse
    /// `url` for its `domain` column.
    pub domain: String,
    pub response_time: f64,
    pub error_message: Option<String>,
    /// Empty unless `status == Success && depth < max_depth`.
    pub links: Vec<Url>,
    /// Unix timestamp, seconds.
    pub timestamp: u64,
}

impl CrawlResult {
    pub fn domain_of(url: &Url) -> String {
        url.host_str().unwrap_or_default().to_ascii_lowercase()
    }
}
