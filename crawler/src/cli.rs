//! Argument surface. Grounded in the teacher's `cli_impl!` macro
//! (`lib-lopez/src/cli.rs`) and `lopez/src/cli.rs`'s concrete `Cli`/
//! `LopezApp`: a `data`-style top-level flag replaced by nothing (this spec
//! has no on-disk directives file to point at), subcommands narrowed to
//! what this spec actually needs (`Run`/`Validate`/`TestUrl` — no `Serve`
//! as its own subcommand, since `--mode cluster` already puts a worker into
//! serving mode; no `PageRank`/`Rm`, dropped along with PageRank itself).

use std::path::PathBuf;
use structopt::StructOpt;

use crawler_core::config::{Configuration, Mode, Profile};
use crawler_store::DbConfig;

#[derive(StructOpt)]
#[structopt(name = "crawler", about = "A distributed, polite, BFS web crawler.")]
pub struct Cli {
    #[structopt(short = "v", long)]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub app: Command,
}

impl Cli {
    /// Best-effort rank for the logger prefix before subcommand args are
    /// known to even have a `Profile`.
    pub fn profile_rank(&self) -> usize {
        match &self.app {
            Command::Run { profile, .. } => profile.rank,
            _ => 0,
        }
    }
}

#[derive(StructOpt)]
pub enum Command {
    /// Runs a crawl.
    Run {
        #[structopt(flatten)]
        config: Configuration,
        #[structopt(flatten)]
        profile: Profile,
        #[structopt(flatten)]
        db: DbConfig,
        #[structopt(long, default_value = "local", env)]
        mode: Mode,
        /// Uses a process-local store instead of Postgres. For development
        /// and the test suite; a real crawl always wants durability.
        #[structopt(long)]
        in_memory: bool,
    },
    /// Validates a seed URL file without crawling anything.
    Validate {
        #[structopt(env)]
        urls_file: PathBuf,
    },
    /// Runs a single URL through the Worker Pipeline and prints the
    /// resulting `CrawlResult`, bypassing the Frontier and Coordinator
    /// entirely. Useful for debugging admission/robots decisions.
    TestUrl {
        #[structopt(flatten)]
        config: Configuration,
        #[structopt(env)]
        test_url: String,
    },
}
