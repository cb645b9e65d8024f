//! The Robots Cache (spec.md §4.3).
//!
//! Parsing and path-matching are lifted close to verbatim from the teacher's
//! `crawler/robots.rs` (`RobotExclusion`/`Match`, built on the `robots_txt`
//! crate). What changes is the fetch policy: the teacher's `get_robots` walks
//! up the domain hierarchy on failure and follows redirects itself one level
//! at a time; this spec's Fetcher already follows redirects internally
//! (§4.4), and any fetch/parse failure here caches an allow-all sentinel
//! instead of trying a parent domain.

use robots_txt::Robots;
use std::collections::HashMap;
use std::sync::Mutex;
use url::{Position, Url};

use crate::model::Status;

#[derive(Debug)]
struct RobotExclusion {
    disallow: Vec<Match>,
    crawl_delay: Option<f64>,
}

impl RobotExclusion {
    fn parse(robots_str: &str, user_agent_token: &str) -> RobotExclusion {
        let robots = Robots::from_str_lossy(robots_str);
        let section = robots.choose_section(user_agent_token);
        RobotExclusion {
            disallow: section
                .rules
                .iter()
                .filter(|rule| !rule.allow)
                .map(|rule| Match::new(&rule.path))
                .collect(),
            crawl_delay: section.crawl_delay.or_else(|| {
                section.req_rate.and_then(|req_rate| {
                    if req_rate.requests > 0 {
                        Some(req_rate.seconds as f64 / req_rate.requests as f64)
                    } else {
                        None
                    }
                })
            }),
        }
    }

    /// The sentinel cached on any fetch or parse failure: nothing disallowed.
    fn allow_all() -> RobotExclusion {
        RobotExclusion {
            disallow: Vec::new(),
            crawl_delay: None,
        }
    }

    fn allows(&self, url: &Url) -> bool {
        !self
            .disallow
            .iter()
            .any(|rule| rule.matches(&url[Position::BeforePath..]))
    }
}

#[derive(Debug)]
struct Match {
    match_str: String,
    is_strict: bool,
}

impl Match {
    fn new(path: &str) -> Match {
        if let Some(stripped) = path.strip_suffix('$') {
            Match {
                match_str: stripped.to_owned(),
                is_strict: true,
            }
        } else {
            Match {
                match_str: path.to_owned(),
                is_strict: false,
            }
        }
    }

    fn matches(&self, mut route: &str) -> bool {
        if self.match_str.is_empty() {
            return false;
        }

        for pattern in self.match_str.split('*') {
            if let Some(found) = route.find(pattern) {
                route = &route[found..];
            } else {
                return false;
            }
        }

        !self.is_strict || route.is_empty()
    }
}

/// What the Fetcher needs to supply so this module stays decoupled from the
/// concrete HTTP client type.
#[async_trait::async_trait]
pub trait RobotsFetch: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Option<String>;
}

/// Per-process, per-origin memoized cache. Never shared across worker
/// processes (spec.md §4.3) — each Worker Pipeline owns one.
///
/// TTL is deliberately not implemented: an entry, once cached, lives for the
/// process's lifetime. See `DESIGN.md` for why.
pub struct RobotsCache {
    entries: Mutex<HashMap<String, RobotExclusion>>,
    user_agent_token: String,
}

impl RobotsCache {
    pub fn new(user_agent_token: impl Into<String>) -> RobotsCache {
        RobotsCache {
            entries: Mutex::new(HashMap::new()),
            user_agent_token: user_agent_token.into(),
        }
    }

    fn origin_key(url: &Url) -> String {
        format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or_default()
        )
    }

    /// `Status::RobotsBlocked` if the cached (or freshly fetched) policy
    /// disallows `url`; `None` if the fetch itself is still needed by the
    /// caller (never returned — fetch happens internally).
    pub async fn is_allowed(&self, fetcher: &dyn RobotsFetch, url: &Url) -> bool {
        let origin = Self::origin_key(url);

        if let Some(cached) = self.entries.lock().expect("poisoned").get(&origin) {
            return cached.allows(url);
        }

        let robots_url = match Url::parse(&origin).and_then(|base| base.join("/robots.txt")) {
            Ok(robots_url) => robots_url,
            Err(_) => {
                let sentinel = RobotExclusion::allow_all();
                let allowed = sentinel.allows(url);
                self.entries.lock().expect("poisoned").insert(origin, sentinel);
                return allowed;
            }
        };

        let exclusion = match fetcher.fetch_text(&robots_url).await {
            Some(body) => RobotExclusion::parse(&body, &self.user_agent_token),
            None => RobotExclusion::allow_all(),
        };

        let allowed = exclusion.allows(url);
        self.entries.lock().expect("poisoned").insert(origin, exclusion);
        allowed
    }

    /// The crawl-delay `robots.txt` requested for the cached origin, if any.
    /// Returns `None` if the origin hasn't been resolved yet.
    pub fn crawl_delay(&self, url: &Url) -> Option<f64> {
        self.entries
            .lock()
            .expect("poisoned")
            .get(&Self::origin_key(url))
            .and_then(|entry| entry.crawl_delay)
    }

    /// Convenience wrapper mapping straight to the pipeline's status taxonomy.
    pub async fn check(&self, fetcher: &dyn RobotsFetch, url: &Url) -> Option<Status> {
        if self.is_allowed(fetcher, url).await {
            None
        } else {
            Some(Status::RobotsBlocked)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubFetch(Option<&'static str>);

    #[async_trait::async_trait]
    impl RobotsFetch for StubFetch {
        async fn fetch_text(&self, _url: &Url) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    #[tokio::test]
    async fn disallowed_path_is_blocked() {
        let robots = "User-Agent: *\nDisallow: /private/\n";
        let cache = RobotsCache::new("crawlerbot");
        let fetcher = StubFetch(Some(robots));

        let blocked = Url::parse("https://example.com/private/page").unwrap();
        let allowed = Url::parse("https://example.com/public/page").unwrap();

        assert!(!cache.is_allowed(&fetcher, &blocked).await);
        assert!(cache.is_allowed(&fetcher, &allowed).await);
    }

    #[tokio::test]
    async fn fetch_failure_allows_everything() {
        let cache = RobotsCache::new("crawlerbot");
        let fetcher = StubFetch(None);
        let url = Url::parse("https://example.com/anything").unwrap();
        assert!(cache.is_allowed(&fetcher, &url).await);
    }

    #[tokio::test]
    async fn result_is_memoized_per_origin() {
        let robots = "User-Agent: *\nDisallow: /blocked\n";
        let cache = RobotsCache::new("crawlerbot");
        let fetcher = StubFetch(Some(robots));

        let first = Url::parse("https://example.com/blocked").unwrap();
        let second = Url::parse("https://example.com/blocked/again").unwrap();

        assert!(!cache.is_allowed(&fetcher, &first).await);
        assert!(!cache.is_allowed(&fetcher, &second).await);
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn strict_suffix_requires_full_consumption() {
        let rule = Match::new("/page$");
        assert!(rule.matches("/page"));
        assert!(!rule.matches("/page/extra"));
    }

    #[test]
    fn wildcard_pattern_matches_segments_in_order() {
        let rule = Match::new("/a*c");
        assert!(rule.matches("/abc"));
        assert!(!rule.matches("/cba"));
    }
}
