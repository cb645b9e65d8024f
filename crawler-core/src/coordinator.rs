//! The Coordinator (spec.md §4.8). Drives the master side of the run.
//!
//! Grounded in the teacher's `crawler/master.rs` `CrawlMaster::start` for the
//! overall shape (build handlers, seed, dispatch loop, terminate handlers on
//! the way out) and in `original_source/src/mpi_coordinator.py::run_master`
//! for the exact termination guard (`results_received < urls_sent or
//! work_queue`) and round-robin-to-the-same-worker reply semantics, which
//! this spec keeps but the teacher's quota/page-rank-driven master does not
//! need. `WorkerHandle` plays the role the teacher's `WorkerHandler` trait
//! plays: a seam between in-process (local) and RPC (cluster) dispatch.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;

use crate::config::Configuration;
use crate::error::Error;
use crate::frontier::Frontier;
use crate::model::{CrawlResult, Job, Status};
use crate::store::Store;
use url::Url;

/// The Coordinator's view of one worker: send it jobs, tell it to stop.
/// `LocalWorkerHandle` (see `lib.rs`'s local-mode wiring) implements this
/// over an in-process channel; an RPC-backed implementation (see `rpc.rs`)
/// implements it over `tarpc` for `--mode cluster`.
#[async_trait]
pub trait WorkerHandle: Send {
    async fn dispatch(&mut self, job: Job) -> Result<(), Error>;
    async fn terminate(&mut self) -> Result<(), Error>;
}

#[derive(Debug, Default)]
pub struct Summary {
    pub urls_sent: usize,
    pub results_received: usize,
    pub success_count: usize,
    pub error_count: usize,
}

pub struct Coordinator<'a> {
    frontier: Frontier,
    store: &'a dyn Store,
    config: &'a Configuration,
    handles: Vec<Box<dyn WorkerHandle>>,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        config: &'a Configuration,
        store: &'a dyn Store,
        handles: Vec<Box<dyn WorkerHandle>>,
    ) -> Coordinator<'a> {
        Coordinator {
            frontier: Frontier::new(config),
            store,
            config,
            handles,
        }
    }

    /// Runs to completion: bootstrap, initial dispatch, main loop, shutdown.
    /// `results` is a single stream every worker's replies are multiplexed
    /// onto, tagged with the worker id that produced them — this is what
    /// lets the Coordinator "block on a result from ANY worker" (spec.md
    /// §4.8 step 3a) regardless of whether workers run in-process or across
    /// the network.
    pub async fn run(
        mut self,
        seeds: Vec<Url>,
        mut results: mpsc::Receiver<(usize, CrawlResult)>,
    ) -> Result<Summary, Error> {
        self.frontier.seed(seeds);

        if self.frontier.is_empty() {
            self.shutdown().await;
            return Ok(Summary::default());
        }

        let mut summary = Summary::default();

        let worker_count = self.handles.len();
        for worker_id in 0..worker_count {
            if self.frontier.is_empty() {
                break;
            }
            let job = self.frontier.next().expect("checked non-empty");
            self.dispatch(worker_id, job, &mut summary).await?;
        }

        while summary.results_received < summary.urls_sent || !self.frontier.is_empty() {
            let (worker_id, result) = results
                .next()
                .await
                .expect("a worker closed its result channel before replying");

            summary.results_received += 1;
            self.frontier.mark_idle(worker_id);

            match result.status {
                Status::Success => summary.success_count += 1,
                _ => summary.error_count += 1,
            }

            log::info!(
                "{} {} depth={} domain={}",
                result.status,
                result.url,
                result.depth,
                result.domain
            );
            if summary.results_received % 10 == 0 {
                log::info!(
                    "progress: received={} sent={} success={} error={}",
                    summary.results_received,
                    summary.urls_sent,
                    summary.success_count,
                    summary.error_count
                );
            }

            if let Err(err) = self.store.insert_result(&result).await {
                log::error!("store write failed for {}: {err}", result.url);
            }

            if result.status == Status::Success && result.depth < self.config.max_depth {
                let mut edges = Vec::new();
                for link in &result.links {
                    if self.frontier.try_admit(link, result.depth + 1, self.config) {
                        edges.push((result.url.clone(), link.clone(), result.depth + 1));
                    }
                }
                if !edges.is_empty() {
                    if let Err(err) = self.store.insert_edges(&edges).await {
                        log::error!("store edge write failed for {}: {err}", result.url);
                    }
                }
            }

            if let Some(job) = self.frontier.next() {
                self.dispatch(worker_id, job, &mut summary).await?;
            }
        }

        self.shutdown().await;
        self.log_final_report().await;
        Ok(summary)
    }

    /// spec.md §7: "a final report at end of run with totals, per-status
    /// counts, per-depth counts, and top-5 domains."
    async fn log_final_report(&self) {
        match self.store.stats().await {
            Ok(stats) => log::info!(
                "crawl report: total={} by_status={:?} by_depth={:?} top_domains={:?}",
                stats.total,
                stats.by_status,
                stats.by_depth,
                stats.top_domains
            ),
            Err(err) => log::error!("failed to compute final stats report: {err}"),
        }
    }

    async fn dispatch(
        &mut self,
        worker_id: usize,
        job: Job,
        summary: &mut Summary,
    ) -> Result<(), Error> {
        self.frontier.mark_active(worker_id);
        self.handles[worker_id].dispatch(job).await?;
        summary.urls_sent += 1;
        Ok(())
    }

    /// Sends the termination sentinel to every worker. Idempotent per
    /// spec.md §4.8 step 4 in the sense that a handle which has already
    /// seen `terminate` simply no-ops on a second call; this loop only ever
    /// calls it once per handle, but nothing prevents a caller from retrying
    /// the whole shutdown sequence.
    async fn shutdown(&mut self) {
        for handle in &mut self.handles {
            if let Err(err) = handle.terminate().await {
                log::warn!("error terminating worker: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct RecordingHandle {
        dispatched: Arc<Mutex<Vec<Job>>>,
        terminated: Arc<Mutex<bool>>,
        results_tx: mpsc::Sender<(usize, CrawlResult)>,
        worker_id: usize,
        script: std::collections::VecDeque<CrawlResult>,
    }

    #[async_trait]
    impl WorkerHandle for RecordingHandle {
        async fn dispatch(&mut self, job: Job) -> Result<(), Error> {
            self.dispatched.lock().unwrap().push(job.clone());
            if let Some(mut result) = self.script.pop_front() {
                result.url = job.url;
                result.depth = job.depth;
                let mut tx = self.results_tx.clone();
                let worker_id = self.worker_id;
                tokio::spawn(async move {
                    let _ = tx.try_send((worker_id, result));
                });
            }
            Ok(())
        }

        async fn terminate(&mut self) -> Result<(), Error> {
            *self.terminated.lock().unwrap() = true;
            Ok(())
        }
    }

    fn success_result() -> CrawlResult {
        CrawlResult {
            url: Url::parse("https://example.com/").unwrap(),
            title: "T".to_owned(),
            content_length: 10,
            status: Status::Success,
            depth: 0,
            domain: "example.com".to_owned(),
            response_time: 0.01,
            error_message: None,
            links: vec![],
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn empty_seed_set_shuts_down_immediately() {
        let config = Configuration::default();
        let store = InMemoryStore::new();
        let (tx, rx) = mpsc::channel(8);
        drop(tx);

        let terminated = Arc::new(Mutex::new(false));
        let handle = RecordingHandle {
            dispatched: Arc::new(Mutex::new(vec![])),
            terminated: terminated.clone(),
            results_tx: mpsc::channel(1).0,
            worker_id: 0,
            script: Default::default(),
        };

        let coordinator = Coordinator::new(&config, &store, vec![Box::new(handle)]);
        let summary = coordinator.run(vec![], rx).await.unwrap();

        assert_eq!(summary.urls_sent, 0);
        assert!(*terminated.lock().unwrap());
    }

    #[tokio::test]
    async fn single_seed_round_trips_to_success() {
        let config = Configuration::default();
        let store = InMemoryStore::new();
        let (tx, rx) = mpsc::channel(8);

        let mut script = std::collections::VecDeque::new();
        script.push_back(success_result());

        let handle = RecordingHandle {
            dispatched: Arc::new(Mutex::new(vec![])),
            terminated: Arc::new(Mutex::new(false)),
            results_tx: tx,
            worker_id: 0,
            script,
        };

        let coordinator = Coordinator::new(&config, &store, vec![Box::new(handle)]);
        let seed = Url::parse("https://example.com/").unwrap();
        let summary = coordinator.run(vec![seed], rx).await.unwrap();

        assert_eq!(summary.urls_sent, 1);
        assert_eq!(summary.results_received, 1);
        assert_eq!(summary.success_count, 1);
        assert_eq!(store.crawled_count(), 1);
    }
}
