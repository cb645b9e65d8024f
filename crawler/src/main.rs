//! CLI entrypoint, analogous to the teacher's `lopez` binary: a thin shell
//! around the library crate (`lib_lopez::main!`/`cli_impl!` there,
//! `crawler_core`/`crawler_store` here) that parses arguments, wires up
//! concrete components, and runs one rank of the crawl to completion.

#[cfg(not(target_env = "musl"))]
#[global_allocator]
static ALLOCATOR: jemallocator::Jemalloc = jemallocator::Jemalloc;

mod cli;

use std::sync::Arc;

use structopt::StructOpt;

use crawler_core::config::{Configuration, Mode, Profile};
use crawler_core::coordinator::{Coordinator, WorkerHandle};
use crawler_core::fetcher::HttpFetcher;
use crawler_core::rpc;
use crawler_core::store::{InMemoryStore, Store};
use crawler_core::{spawn_local_worker, LocalWorkerHandle};
use crawler_store::{DbConfig, PostgresStore};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    crawler_core::panic::log_panics();

    let cli = Cli::from_args();
    crawler_core::logger::init_logger(cli.profile_rank(), cli.verbose);

    match cli.app {
        Command::Run {
            config,
            profile,
            db,
            mode,
            in_memory,
        } => run(config, profile, db, mode, in_memory).await,
        Command::Validate { urls_file } => validate(urls_file).await,
        Command::TestUrl { config, test_url } => test_url(config, test_url).await,
    }
}

async fn run(
    config: Configuration,
    profile: Profile,
    db: DbConfig,
    mode: Mode,
    in_memory: bool,
) -> Result<(), anyhow::Error> {
    match mode {
        Mode::Local => run_local(config, profile, db, in_memory).await,
        Mode::Cluster if profile.rank == 0 => run_cluster_coordinator(config, profile, db, in_memory).await,
        Mode::Cluster => run_cluster_worker(config, profile).await,
    }
}

async fn build_store(db: DbConfig, in_memory: bool) -> Result<Box<dyn Store>, anyhow::Error> {
    if in_memory {
        return Ok(Box::new(InMemoryStore::new()));
    }

    db.ensure_create_db().await?;
    let db = Arc::new(db);
    db.clone().sync_migrations().await?;
    let client = db.connect().await?;
    Ok(Box::new(PostgresStore::init(client).await?))
}

/// Runs coordinator and every worker in-process over in-memory channels
/// (`--mode local`), ignoring `--rank`/`--worker-addrs`/etc. entirely.
async fn run_local(
    config: Configuration,
    profile: Profile,
    db: DbConfig,
    in_memory: bool,
) -> Result<(), anyhow::Error> {
    let store = build_store(db, in_memory).await?;

    let seeds = crawler_core::seeds::load_seed_urls(&config.urls_file)?;
    log::info!("loaded {} seed urls", seeds.len());

    let (results_tx, results_rx) = futures::channel::mpsc::channel(4 * profile.max_tasks_per_worker);

    let worker_count = profile.world_size.saturating_sub(1).max(1);
    let mut handles: Vec<Box<dyn WorkerHandle>> = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let fetcher = Box::new(HttpFetcher::new(
            config.user_agent.clone(),
            config.request_timeout,
            config.max_redirects,
        ));
        let handle: LocalWorkerHandle =
            spawn_local_worker(worker_id, fetcher, config.clone(), results_tx.clone());
        handles.push(Box::new(handle));
    }

    let coordinator = Coordinator::new(&config, store.as_ref(), handles);
    let summary = coordinator.run(seeds, results_rx).await?;

    log::info!(
        "crawl done: sent={} received={} success={} error={}",
        summary.urls_sent,
        summary.results_received,
        summary.success_count,
        summary.error_count
    );

    Ok(())
}

/// Rank 0 of `--mode cluster`: connects out to every worker's `WorkerRpc`
/// endpoint and serves `CoordinatorRpc` for workers to report back on.
async fn run_cluster_coordinator(
    config: Configuration,
    profile: Profile,
    db: DbConfig,
    in_memory: bool,
) -> Result<(), anyhow::Error> {
    let store = build_store(db, in_memory).await?;
    let seeds = crawler_core::seeds::load_seed_urls(&config.urls_file)?;

    let token = rpc::Token::from(profile.token.clone());
    let (results_tx, results_rx) = futures::channel::mpsc::channel(4096);

    if let Some(coordinator_addr) = profile.coordinator_addr {
        let server = rpc::CoordinatorRpcServer::new(token.clone(), results_tx);
        tokio::spawn(rpc::serve_coordinator(coordinator_addr, server, 128));
    }

    let mut handles: Vec<Box<dyn WorkerHandle>> = Vec::with_capacity(profile.worker_addrs.len());
    for addr in &profile.worker_addrs {
        let client = rpc::connect_worker(*addr).await?;
        handles.push(Box::new(rpc::RemoteWorkerHandle::new(client, token.clone())));
    }

    let coordinator = Coordinator::new(&config, store.as_ref(), handles);
    let summary = coordinator.run(seeds, results_rx).await?;

    log::info!(
        "crawl done: sent={} received={} success={} error={}",
        summary.urls_sent,
        summary.results_received,
        summary.success_count,
        summary.error_count
    );

    Ok(())
}

/// Rank 1..N-1 of `--mode cluster`: serves `WorkerRpc` for the coordinator
/// to dispatch jobs into, and reports results back over `CoordinatorRpc`.
async fn run_cluster_worker(config: Configuration, profile: Profile) -> Result<(), anyhow::Error> {
    let bind = profile
        .bind
        .ok_or_else(|| anyhow::anyhow!("--bind is required for a cluster-mode worker"))?;
    let coordinator_addr = profile
        .coordinator_addr
        .ok_or_else(|| anyhow::anyhow!("--coordinator-addr is required for a cluster-mode worker"))?;

    let token = rpc::Token::from(profile.token.clone());
    let coordinator_client = rpc::connect_coordinator(coordinator_addr).await?;

    let (jobs_tx, mut jobs_rx) = tokio::sync::mpsc::unbounded_channel();
    let server = rpc::WorkerRpcServer::new(token.clone(), jobs_tx);
    let serve_task = tokio::spawn(rpc::serve_worker(bind, server, 16));

    let fetcher = Box::new(HttpFetcher::new(
        config.user_agent.clone(),
        config.request_timeout,
        config.max_redirects,
    ));
    let worker = crawler_core::worker::CrawlWorker::new(fetcher, config);

    // The Coordinator indexes its `handles` Vec (built from `worker_addrs`,
    // one entry per rank 1..N-1) by a 0-based id; this rank is 1-based, so
    // it must be translated before being reported back.
    let handle_id = profile.rank.checked_sub(1).expect("worker rank must be >= 1");

    while let Some(Some(job)) = jobs_rx.recv().await {
        let result = worker.process(job).await;
        coordinator_client
            .report(tarpc::context::current(), token.clone(), handle_id, result)
            .await??;
    }

    serve_task.abort();
    log::info!("worker {} stopped", profile.rank);
    Ok(())
}

async fn validate(urls_file: std::path::PathBuf) -> Result<(), anyhow::Error> {
    let seeds = crawler_core::seeds::load_seed_urls(&urls_file)?;
    println!("{} valid seed url(s) in {}", seeds.len(), urls_file.display());
    Ok(())
}

async fn test_url(config: Configuration, test_url: String) -> Result<(), anyhow::Error> {
    let url = url::Url::parse(&test_url)?;
    let fetcher = Box::new(HttpFetcher::new(
        config.user_agent.clone(),
        config.request_timeout,
        config.max_redirects,
    ));
    let worker = crawler_core::worker::CrawlWorker::new(fetcher, config);
    let job = crawler_core::model::Job::new(url, 0);
    let result = worker.process(job).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
