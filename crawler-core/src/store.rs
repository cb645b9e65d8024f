//! The Result Store contract (spec.md §4.9).
//!
//! The teacher expresses its persistence seam as a family of generic traits
//! (`Backend`/`MasterBackend`/`WorkerBackendFactory`/`WorkerBackend`, see
//! `backend.rs`/`backend/mod.rs`) built to support pluggable backends and an
//! optional PageRank pass. This spec has one backend and no PageRank, so the
//! same idea — "persistence behind a trait, so tests don't need a live
//! database" — is right-sized here to a single `Store` trait with one
//! production implementation (`crawler_store::PostgresStore`) and one
//! in-memory implementation for tests, mirroring the teacher's
//! `backend::dummy::DummyBackend` in spirit (a non-production stand-in
//! satisfying the same contract) without the panic-on-use posture dummy
//! implementations usually take.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::error::Error;
use crate::model::CrawlResult;

/// Aggregate counts for the end-of-run report (spec.md §7): totals,
/// per-status and per-depth breakdowns, and the busiest domains.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
    pub by_depth: HashMap<u16, usize>,
    /// At most 5 entries, sorted by count descending.
    pub top_domains: Vec<(String, usize)>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert on `url` (spec.md §4.9: "Write is upsert semantics on `url`").
    async fn insert_result(&self, result: &CrawlResult) -> Result<(), Error>;

    /// Records `(source_url, target_url, depth)` edges discovered by a
    /// successful crawl. Called only for links the Frontier actually
    /// admitted; duplicate `(source_url, target_url)` pairs are silently
    /// ignored.
    async fn insert_edges(&self, edges: &[(Url, Url, u16)]) -> Result<(), Error>;

    async fn exists(&self, url: &Url) -> Result<bool, Error>;

    /// Aggregate counts over every result written so far.
    async fn stats(&self) -> Result<Stats, Error>;
}

/// A process-local stand-in for tests and `--mode local` dry runs that
/// don't need durability across runs.
#[derive(Default)]
pub struct InMemoryStore {
    results: Mutex<HashMap<Url, CrawlResult>>,
    edges: Mutex<Vec<(Url, Url, u16)>>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    pub fn crawled_count(&self) -> usize {
        self.results.lock().expect("poisoned").len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().expect("poisoned").len()
    }

    pub fn result_for(&self, url: &Url) -> Option<CrawlResult> {
        self.results.lock().expect("poisoned").get(url).cloned()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_result(&self, result: &CrawlResult) -> Result<(), Error> {
        self.results
            .lock()
            .expect("poisoned")
            .insert(result.url.clone(), result.clone());
        Ok(())
    }

    async fn insert_edges(&self, edges: &[(Url, Url, u16)]) -> Result<(), Error> {
        let mut stored = self.edges.lock().expect("poisoned");
        for edge @ (source, target, _) in edges {
            if !stored
                .iter()
                .any(|(s, t, _)| s == source && t == target)
            {
                stored.push(edge.clone());
            }
        }
        Ok(())
    }

    async fn exists(&self, url: &Url) -> Result<bool, Error> {
        Ok(self.results.lock().expect("poisoned").contains_key(url))
    }

    async fn stats(&self) -> Result<Stats, Error> {
        let results = self.results.lock().expect("poisoned");

        let mut by_status = HashMap::new();
        let mut by_depth = HashMap::new();
        let mut by_domain: HashMap<String, usize> = HashMap::new();

        for result in results.values() {
            *by_status.entry(result.status.as_str().to_owned()).or_insert(0) += 1;
            *by_depth.entry(result.depth).or_insert(0) += 1;
            *by_domain.entry(result.domain.clone()).or_insert(0) += 1;
        }

        let mut top_domains: Vec<(String, usize)> = by_domain.into_iter().collect();
        top_domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_domains.truncate(5);

        Ok(Stats {
            total: results.len(),
            by_status,
            by_depth,
            top_domains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn result(url: &str) -> CrawlResult {
        CrawlResult {
            url: Url::parse(url).unwrap(),
            title: "T".to_owned(),
            content_length: 1,
            status: Status::Success,
            depth: 0,
            domain: "example.com".to_owned(),
            response_time: 0.0,
            error_message: None,
            links: vec![],
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn insert_result_is_upsert_on_url() {
        let store = InMemoryStore::new();
        let mut first = result("https://example.com/");
        store.insert_result(&first).await.unwrap();
        assert_eq!(store.crawled_count(), 1);

        first.title = "Updated".to_owned();
        store.insert_result(&first).await.unwrap();
        assert_eq!(store.crawled_count(), 1);
        assert_eq!(store.result_for(&first.url).unwrap().title, "Updated");
    }

    #[tokio::test]
    async fn exists_reflects_inserted_urls() {
        let store = InMemoryStore::new();
        let url = Url::parse("https://example.com/").unwrap();
        assert!(!store.exists(&url).await.unwrap());
        store.insert_result(&result(url.as_str())).await.unwrap();
        assert!(store.exists(&url).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_edges_are_ignored() {
        let store = InMemoryStore::new();
        let source = Url::parse("https://example.com/").unwrap();
        let target = Url::parse("https://example.com/a").unwrap();
        store
            .insert_edges(&[(source.clone(), target.clone(), 1)])
            .await
            .unwrap();
        store
            .insert_edges(&[(source, target, 1)])
            .await
            .unwrap();
        assert_eq!(store.edge_count(), 1);
    }

    #[tokio::test]
    async fn stats_aggregates_status_depth_and_top_domains() {
        let store = InMemoryStore::new();
        let mut blocked = result("https://a.example/");
        blocked.status = Status::Blocked;
        blocked.domain = "a.example".to_owned();
        blocked.depth = 1;
        store.insert_result(&blocked).await.unwrap();

        let mut success = result("https://b.example/");
        success.domain = "b.example".to_owned();
        success.depth = 0;
        store.insert_result(&success).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.get("blocked"), Some(&1));
        assert_eq!(stats.by_status.get("success"), Some(&1));
        assert_eq!(stats.by_depth.get(&0), Some(&1));
        assert_eq!(stats.by_depth.get(&1), Some(&1));
        assert_eq!(stats.top_domains.len(), 2);
    }
}
