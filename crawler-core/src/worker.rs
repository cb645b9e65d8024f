//! The Worker Pipeline (spec.md §4.6).
//!
//! Grounded in the teacher's `crawler/worker/mod.rs` `CrawlWorker` (the
//! `crawl`/`store`/`crawl_task` split, `Counter` bookkeeping around each
//! task) and `crawler/worker/origins.rs` (per-origin state kept across jobs).
//! What's dropped relative to the teacher: the generic `WorkerBackend`
//! plumbing (this pipeline talks to a concrete [`Store`] instead), the
//! directives-driven `Boundaries`/`Parser` traits (replaced by the free
//! functions in `admission.rs`/`page_parser.rs`), and `Reason`-tagged links
//! (this spec's link model is untyped: every discovered link is just a URL).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use url::Url;

use crate::admission::is_allowed;
use crate::config::Configuration;
use crate::counter::Counter;
use crate::model::{CrawlResult, Job, Status};
use crate::page_parser;
use crate::robots::RobotsCache;
use crate::fetcher::FetchClient;

/// Per-origin last-fetch timestamps, kept across jobs for the lifetime of
/// the worker process (spec.md §4.6: "a worker ... keeps ... the last-fetch
/// table across jobs").
struct LastFetchTable {
    last_fetch: Mutex<HashMap<String, Instant>>,
}

impl LastFetchTable {
    fn new() -> LastFetchTable {
        LastFetchTable {
            last_fetch: Mutex::new(HashMap::new()),
        }
    }

    /// Sleeps until `crawl_delay` has elapsed since the domain's last fetch
    /// start, then records now as the new last-fetch start.
    async fn wait_turn(&self, domain: &str, crawl_delay: Duration) {
        let wait = {
            let mut table = self.last_fetch.lock().expect("poisoned");
            let now = Instant::now();
            let wait = table
                .get(domain)
                .and_then(|last| crawl_delay.checked_sub(now.duration_since(*last)));
            table.insert(domain.to_owned(), now);
            wait
        };

        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
    }
}

pub struct CrawlWorker {
    fetcher: Box<dyn FetchClient>,
    robots: RobotsCache,
    origins: LastFetchTable,
    counter: Counter,
    config: Configuration,
}

impl CrawlWorker {
    pub fn new(fetcher: Box<dyn FetchClient>, config: Configuration) -> CrawlWorker {
        let robots = RobotsCache::new(config.user_agent_token().to_owned());
        CrawlWorker {
            fetcher,
            robots,
            origins: LastFetchTable::new(),
            counter: Counter::default(),
            config,
        }
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// Runs the full per-job procedure of spec.md §4.6 steps 2-9 for one
    /// `Job`, never returning an error: every failure mode is captured as a
    /// `Status` on the resulting `CrawlResult` instead.
    pub async fn process(&self, job: Job) -> CrawlResult {
        let start = Instant::now();
        let domain = CrawlResult::domain_of(&job.url);

        self.counter.register_open();
        let result = self.process_inner(&job, &domain, start).await;
        if result.status == Status::Success {
            self.counter.register_closed();
        } else {
            self.counter.register_error();
        }
        result
    }

    async fn process_inner(&self, job: &Job, domain: &str, start: Instant) -> CrawlResult {
        if !is_allowed(&job.url, &self.config) {
            return self.blocked_result(job, domain, start, Status::Blocked, None);
        }

        self.origins
            .wait_turn(domain, Duration::from_secs_f64(self.config.crawl_delay))
            .await;

        if self.config.respect_robots_txt() {
            if let Some(status) = self.robots.check(self.fetcher.as_ref(), &job.url).await {
                return self.blocked_result(job, domain, start, status, None);
            }
        }

        let fetched = match self.fetcher.fetch(&job.url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                return self.blocked_result(
                    job,
                    domain,
                    start,
                    Status::RequestError,
                    Some(err.to_string()),
                )
            }
        };

        if !fetched.status_code.is_success() {
            return self.blocked_result(
                job,
                domain,
                start,
                Status::RequestError,
                Some(format!("http status {}", fetched.status_code)),
            );
        }

        let parsed = page_parser::parse(
            &fetched.body,
            fetched.content_type.as_deref(),
            &job.url,
        );

        let links = if job.depth < self.config.max_depth {
            parsed
                .links
                .into_iter()
                .filter(|link| is_allowed(link, &self.config))
                .collect()
        } else {
            Vec::new()
        };

        CrawlResult {
            url: job.url.clone(),
            title: parsed.title,
            content_length: fetched.body.len(),
            status: Status::Success,
            depth: job.depth,
            domain: domain.to_owned(),
            response_time: start.elapsed().as_secs_f64(),
            error_message: None,
            links,
            timestamp: crate::time::unix_now(),
        }
    }

    fn blocked_result(
        &self,
        job: &Job,
        domain: &str,
        start: Instant,
        status: Status,
        error_message: Option<String>,
    ) -> CrawlResult {
        CrawlResult {
            url: job.url.clone(),
            title: String::new(),
            content_length: 0,
            status,
            depth: job.depth,
            domain: domain.to_owned(),
            response_time: start.elapsed().as_secs_f64(),
            error_message,
            links: Vec::new(),
            timestamp: crate::time::unix_now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{Fetched, Fetcher};
    use crate::error::Error;
    use async_trait::async_trait;
    use http::StatusCode;

    struct StubFetcher {
        body: &'static str,
        content_type: &'static str,
        status_code: StatusCode,
    }

    impl StubFetcher {
        fn new(body: &'static str, content_type: &'static str) -> StubFetcher {
            StubFetcher {
                body,
                content_type,
                status_code: StatusCode::OK,
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Fetched, Error> {
            Ok(Fetched {
                status_code: self.status_code,
                content_type: Some(self.content_type.to_owned()),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    #[async_trait]
    impl crate::robots::RobotsFetch for StubFetcher {
        async fn fetch_text(&self, _url: &Url) -> Option<String> {
            None
        }
    }

    fn config() -> Configuration {
        let mut cfg = Configuration::default();
        cfg.crawl_delay = 0.0;
        cfg
    }

    #[tokio::test]
    async fn success_result_carries_links_below_max_depth() {
        let fetcher = Box::new(StubFetcher::new(
            r#"<title>Hi</title><a href="/next">n</a>"#,
            "text/html",
        ));
        let worker = CrawlWorker::new(fetcher, config());
        let job = Job::new(Url::parse("https://example.com/").unwrap(), 0);

        let result = worker.process(job).await;
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.title, "Hi");
        assert_eq!(result.links.len(), 1);
        assert_eq!(worker.counter().n_active(), 0);
    }

    #[tokio::test]
    async fn links_dropped_at_max_depth() {
        let fetcher = Box::new(StubFetcher::new(r#"<a href="/next">n</a>"#, "text/html"));
        let cfg = config();
        let worker = CrawlWorker::new(fetcher, cfg.clone());
        let job = Job::new(Url::parse("https://example.com/").unwrap(), cfg.max_depth);

        let result = worker.process(job).await;
        assert_eq!(result.status, Status::Success);
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn blocked_by_admission_filter_short_circuits() {
        let mut cfg = config();
        cfg.blocked_domains.insert("example.com".to_owned());
        let fetcher = Box::new(StubFetcher::new("", "text/html"));
        let worker = CrawlWorker::new(fetcher, cfg);
        let job = Job::new(Url::parse("https://example.com/").unwrap(), 0);

        let result = worker.process(job).await;
        assert_eq!(result.status, Status::Blocked);
    }

    #[tokio::test]
    async fn non_success_status_code_becomes_request_error() {
        let mut fetcher = StubFetcher::new("<title>Missing</title>", "text/html");
        fetcher.status_code = StatusCode::NOT_FOUND;
        let worker = CrawlWorker::new(Box::new(fetcher), config());
        let job = Job::new(Url::parse("https://example.com/missing").unwrap(), 0);

        let result = worker.process(job).await;
        assert_eq!(result.status, Status::RequestError);
        assert!(result.error_message.is_some());
        assert_eq!(worker.counter().n_error(), 1);
    }

    #[tokio::test]
    async fn counter_active_count_does_not_underflow_after_errors() {
        let mut fetcher = StubFetcher::new("", "text/html");
        fetcher.status_code = StatusCode::INTERNAL_SERVER_ERROR;
        let worker = CrawlWorker::new(Box::new(fetcher), config());
        let job = Job::new(Url::parse("https://example.com/").unwrap(), 0);

        worker.process(job).await;
        assert_eq!(worker.counter().n_closed(), 1);
        assert_eq!(worker.counter().n_active(), 0);
    }
}
