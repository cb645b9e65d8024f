//! Library crate backing the `crawler` binary: every pipeline stage named in
//! spec.md §2 except the Result Store's concrete (Postgres) implementation,
//! which lives in `crawler-store` so this crate stays usable without a
//! database for tests and `--mode local` dry runs.

pub mod admission;
pub mod canonical;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod error;
pub mod fetcher;
pub mod frontier;
pub mod logger;
pub mod model;
pub mod page_parser;
pub mod panic;
pub mod robots;
pub mod rpc;
pub mod seeds;
pub mod store;
pub mod time;
pub mod worker;

use async_trait::async_trait;
use futures::channel::mpsc;
use tokio::sync::mpsc as tokio_mpsc;

use config::Configuration;
use coordinator::WorkerHandle;
use error::Error;
use fetcher::FetchClient;
use model::{CrawlResult, Job};
use worker::CrawlWorker;

/// The Coordinator-side [`WorkerHandle`] for `--mode local`: dispatches over
/// an in-process channel to a worker task running in the same process.
/// Plays the role the teacher's `LocalHandler` plays for `LocalHandlerFactory`
/// (`crawler/worker/mod.rs`).
pub struct LocalWorkerHandle {
    jobs: tokio_mpsc::UnboundedSender<Option<Job>>,
    task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl WorkerHandle for LocalWorkerHandle {
    async fn dispatch(&mut self, job: Job) -> Result<(), Error> {
        self.jobs
            .send(Some(job))
            .map_err(|_| Error::Custom("local worker task exited".to_owned()))
    }

    async fn terminate(&mut self) -> Result<(), Error> {
        // Idempotent: sending on an already-closed channel is a no-op error
        // we deliberately ignore, matching spec.md §4.8 step 4.
        let _ = self.jobs.send(None);
        Ok(())
    }
}

/// Spawns a worker task in this process and returns the handle the
/// Coordinator dispatches jobs through. `worker_id` is echoed back on every
/// `CrawlResult` sent over `results`, so the Coordinator can re-dispatch to
/// the same worker (spec.md §4.8 step 3e).
pub fn spawn_local_worker(
    worker_id: usize,
    fetcher: Box<dyn FetchClient>,
    config: Configuration,
    mut results: mpsc::Sender<(usize, CrawlResult)>,
) -> LocalWorkerHandle {
    let (jobs_tx, mut jobs_rx) = tokio_mpsc::unbounded_channel::<Option<Job>>();

    let task = tokio::spawn(async move {
        let worker = CrawlWorker::new(fetcher, config);

        while let Some(Some(job)) = jobs_rx.recv().await {
            let result = worker.process(job).await;
            if results.try_send((worker_id, result)).is_err() {
                log::warn!("coordinator result channel closed, worker {worker_id} stopping");
                break;
            }
        }

        log::info!("worker {worker_id} stopped");
    });

    LocalWorkerHandle {
        jobs: jobs_tx,
        task,
    }
}

impl Drop for LocalWorkerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
