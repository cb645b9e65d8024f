use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use structopt::StructOpt;

/// Crawl-level configuration, recognized options per spec.md §6. Defaults
/// match the spec's defaults column exactly.
///
/// Loading this from an on-disk format is the configuration loader's job
/// (an external collaborator per spec.md §1); this struct is the in-memory
/// shape it is expected to produce.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub struct Configuration {
    #[structopt(long, default_value = "2", env)]
    pub max_depth: u16,
    #[structopt(long, default_value = "1.0", env)]
    pub crawl_delay: f64,
    #[structopt(long, default_value = "10", env)]
    pub request_timeout: u64,
    #[structopt(long, default_value = "50", env)]
    pub max_urls_per_domain: usize,
    #[structopt(long, default_value = "Mozilla/5.0 (compatible; ParallelCrawler/1.0)", env)]
    pub user_agent: String,
    #[structopt(long, env)]
    pub verify_ssl: bool,
    #[structopt(long, default_value = "5", env)]
    pub max_redirects: u8,
    /// Disables robots.txt compliance. Respecting robots.txt is the default.
    #[structopt(long = "ignore-robots-txt", env)]
    ignore_robots_txt: bool,
    #[structopt(long, default_value = "3600", env)]
    pub robots_cache_duration: u64,
    #[structopt(long, default_value = "2000", env)]
    pub max_url_length: usize,
    #[structopt(skip = Configuration::default_allowed_schemes())]
    pub allowed_schemes: HashSet<String>,
    #[structopt(skip = Configuration::default_allowed_extensions())]
    pub allowed_extensions: HashSet<String>,
    #[structopt(skip = Configuration::default_blocked_extensions())]
    pub blocked_extensions: HashSet<String>,
    #[structopt(skip)]
    pub blocked_domains: HashSet<String>,
    #[structopt(long, default_value = "urls.txt", env)]
    pub urls_file: PathBuf,
}

impl Configuration {
    fn default_allowed_schemes() -> HashSet<String> {
        ["http", "https"].iter().map(|s| s.to_string()).collect()
    }

    /// Pages without a `.`-containing basename are always allowed regardless
    /// of this set (spec.md §4.2 bullet 3's "no extension" escape hatch).
    fn default_allowed_extensions() -> HashSet<String> {
        [
            ".html", ".htm", ".php", ".asp", ".aspx", ".jsp", ".py", ".rb", ".pl",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_blocked_extensions() -> HashSet<String> {
        [
            ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".7z",
            ".tar", ".gz", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".ico", ".mp3",
            ".mp4", ".wav", ".avi", ".mov", ".wmv", ".exe", ".msi", ".deb", ".rpm", ".dmg",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// The first whitespace-separated token of the configured UA string, used
    /// for robots.txt section matching (spec.md §4.3).
    pub fn user_agent_token(&self) -> &str {
        self.user_agent.split_whitespace().next().unwrap_or("*")
    }

    pub fn respect_robots_txt(&self) -> bool {
        !self.ignore_robots_txt
    }
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            max_depth: 2,
            crawl_delay: 1.0,
            request_timeout: 10,
            max_urls_per_domain: 50,
            user_agent: "Mozilla/5.0 (compatible; ParallelCrawler/1.0)".to_owned(),
            verify_ssl: false,
            max_redirects: 5,
            ignore_robots_txt: false,
            robots_cache_duration: 3600,
            max_url_length: 2000,
            allowed_schemes: Configuration::default_allowed_schemes(),
            allowed_extensions: Configuration::default_allowed_extensions(),
            blocked_extensions: Configuration::default_blocked_extensions(),
            blocked_domains: HashSet::new(),
            urls_file: PathBuf::from("urls.txt"),
        }
    }
}

/// Process-level knobs: how many workers, how big a dispatch batch, and so
/// on. Distinct from [`Configuration`] the same way the teacher distinguishes
/// `Parameters` (crawl-level) from `Profile` (process-level).
#[derive(Debug, Clone, StructOpt)]
pub struct Profile {
    /// Total number of peer processes (this one included). Rank 0 is the
    /// coordinator; ranks 1..N-1 are workers.
    #[structopt(long, default_value = "2", env)]
    pub world_size: usize,
    /// This process's rank within the run.
    #[structopt(long, env)]
    pub rank: usize,
    /// How many jobs the coordinator pulls off the frontier per dispatch
    /// round before going back to round-robin over workers.
    #[structopt(long, default_value = "64", env)]
    pub batch_size: usize,
    /// Maximum number of concurrent in-flight fetches a single worker
    /// process will run.
    #[structopt(long, default_value = "32", env)]
    pub max_tasks_per_worker: usize,
    /// Addresses of the worker processes, ordered by rank (coordinator-only,
    /// `--mode cluster`). Stands in for "the launch environment" of
    /// spec.md §6.
    #[structopt(long, env)]
    pub worker_addrs: Vec<SocketAddr>,
    /// Address this process binds to serve the JOB channel (worker-only,
    /// `--mode cluster`).
    #[structopt(long, env)]
    pub bind: Option<SocketAddr>,
    /// Address of the coordinator's RESULT channel (worker-only,
    /// `--mode cluster`).
    #[structopt(long, env)]
    pub coordinator_addr: Option<SocketAddr>,
    /// Shared token rejecting stray connections on the RPC channels.
    #[structopt(long, default_value = "", env)]
    pub token: String,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            world_size: 2,
            rank: 0,
            batch_size: 64,
            max_tasks_per_worker: 32,
            worker_addrs: vec![],
            bind: None,
            coordinator_addr: None,
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, StructOpt)]
pub enum Mode {
    /// Run coordinator and all workers in a single process over in-memory
    /// channels. Useful for development and for `test-url`.
    Local,
    /// Run as one peer of a distributed topology (see `Profile`).
    Cluster,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Local
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Mode, String> {
        match s {
            "local" => Ok(Mode::Local),
            "cluster" => Ok(Mode::Cluster),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
