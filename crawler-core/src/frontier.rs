//! The Frontier (spec.md §3, §4.7): master-only BFS queue, visited set, and
//! per-domain admission quota.
//!
//! Not directly grounded in any single teacher file — the teacher's
//! `CrawlMaster` (`crawler/master.rs`) folds frontier bookkeeping straight
//! into its own fields rather than splitting it into a standalone type. This
//! module pulls that bookkeeping out on its own because spec.md names the
//! Frontier as a distinct component with its own invariants (P1-P3); the
//! surrounding `Coordinator` (see `coordinator.rs`) plays the role
//! `CrawlMaster` plays in the teacher.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::admission::is_allowed;
use crate::config::Configuration;
use crate::model::{CrawlResult, Job};
use url::Url;

pub struct Frontier {
    visited: HashSet<Url>,
    queue: VecDeque<Job>,
    domain_counts: HashMap<String, usize>,
    active_workers: HashSet<usize>,
    max_urls_per_domain: usize,
    max_depth: u16,
}

impl Frontier {
    pub fn new(config: &Configuration) -> Frontier {
        Frontier {
            visited: HashSet::new(),
            queue: VecDeque::new(),
            domain_counts: HashMap::new(),
            active_workers: HashSet::new(),
            max_urls_per_domain: config.max_urls_per_domain,
            max_depth: config.max_depth,
        }
    }

    /// Admits every not-yet-visited seed URL at depth 0, bypassing the
    /// per-domain quota and Admission Filter — seeds are operator-supplied,
    /// trusted input.
    pub fn seed(&mut self, urls: impl IntoIterator<Item = Url>) {
        for url in urls {
            if self.visited.insert(url.clone()) {
                let domain = CrawlResult::domain_of(&url);
                *self.domain_counts.entry(domain).or_insert(0) += 1;
                self.queue.push_back(Job::new(url, 0));
            }
        }
    }

    /// Admits a discovered link at `depth` if it passes every gate: not
    /// already visited, under the per-domain quota, and allowed by the
    /// Admission Filter. Returns whether it was admitted.
    pub fn try_admit(&mut self, url: &Url, depth: u16, config: &Configuration) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if self.visited.contains(url) {
            return false;
        }

        let domain = CrawlResult::domain_of(url);
        let count = self.domain_counts.get(&domain).copied().unwrap_or(0);
        if count >= self.max_urls_per_domain {
            return false;
        }

        if !is_allowed(url, config) {
            return false;
        }

        self.visited.insert(url.clone());
        *self.domain_counts.entry(domain).or_insert(0) += 1;
        self.queue.push_back(Job::new(url.clone(), depth));
        true
    }

    pub fn next(&mut self) -> Option<Job> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn mark_active(&mut self, worker_id: usize) {
        self.active_workers.insert(worker_id);
    }

    pub fn mark_idle(&mut self, worker_id: usize) {
        self.active_workers.remove(&worker_id);
    }

    pub fn active_worker_count(&self) -> usize {
        self.active_workers.len()
    }

    /// The run is over iff the queue is drained and no worker still holds a
    /// Job (spec.md §3 invariant).
    pub fn is_terminal(&self) -> bool {
        self.queue.is_empty() && self.active_workers.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::default()
    }

    #[test]
    fn seed_dedupes_and_enqueues_at_depth_zero() {
        let mut frontier = Frontier::new(&config());
        let url = Url::parse("https://example.com/").unwrap();
        frontier.seed(vec![url.clone(), url.clone()]);
        assert_eq!(frontier.len(), 1);
        let job = frontier.next().unwrap();
        assert_eq!(job.depth, 0);
        assert_eq!(job.url, url);
    }

    #[test]
    fn try_admit_rejects_duplicates() {
        let mut frontier = Frontier::new(&config());
        let cfg = config();
        let url = Url::parse("https://example.com/a").unwrap();
        assert!(frontier.try_admit(&url, 1, &cfg));
        assert!(!frontier.try_admit(&url, 1, &cfg));
    }

    #[test]
    fn try_admit_enforces_per_domain_quota() {
        let mut cfg = config();
        cfg.max_urls_per_domain = 2;
        let mut frontier = Frontier::new(&cfg);

        assert!(frontier.try_admit(&Url::parse("https://example.com/a").unwrap(), 1, &cfg));
        assert!(frontier.try_admit(&Url::parse("https://example.com/b").unwrap(), 1, &cfg));
        assert!(!frontier.try_admit(&Url::parse("https://example.com/c").unwrap(), 1, &cfg));
    }

    #[test]
    fn try_admit_rejects_depth_beyond_max() {
        let cfg = config();
        let mut frontier = Frontier::new(&cfg);
        let url = Url::parse("https://example.com/a").unwrap();
        assert!(!frontier.try_admit(&url, cfg.max_depth + 1, &cfg));
    }

    #[test]
    fn queue_is_fifo() {
        let cfg = config();
        let mut frontier = Frontier::new(&cfg);
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();
        frontier.try_admit(&a, 1, &cfg);
        frontier.try_admit(&b, 1, &cfg);
        assert_eq!(frontier.next().unwrap().url, a);
        assert_eq!(frontier.next().unwrap().url, b);
    }

    #[test]
    fn terminal_requires_empty_queue_and_no_active_workers() {
        let cfg = config();
        let mut frontier = Frontier::new(&cfg);
        assert!(frontier.is_terminal());
        frontier.mark_active(1);
        assert!(!frontier.is_terminal());
        frontier.mark_idle(1);
        assert!(frontier.is_terminal());
    }
}
