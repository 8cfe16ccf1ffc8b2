//! Command-line parsing for the BTP/BOT snapshot scraper.
//!
//! Argument parsing and command dispatch stay separate from the pipeline so
//! the library can be driven without a process boundary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::{DEFAULT_BOT_URL, DEFAULT_BTP_URL};
use crate::domain::InstrumentKind;
use crate::io::DEFAULT_SNAPSHOT_PATH;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "btp", version, about = "Italian government bond (BTP/BOT) yield snapshot scraper")]
pub struct Cli {
    /// Log filter (e.g. `info`, `btp_tracker=debug`). `RUST_LOG` wins when set.
    #[arg(long, global = true, env = "BTP_LOG", default_value = "btp_tracker=info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch both listing pages, compute yields, and persist the snapshot.
    Scrape(ScrapeArgs),
    /// Print a previously persisted snapshot.
    Show(ShowArgs),
    /// Run one family's scanner over a saved HTML page (no network, no write).
    Scan(ScanArgs),
}

/// Options for `btp scrape`.
#[derive(Debug, Parser, Clone)]
pub struct ScrapeArgs {
    /// Where to persist the snapshot JSON.
    #[arg(short, long, env = "BTP_OUTPUT", default_value = DEFAULT_SNAPSHOT_PATH)]
    pub output: PathBuf,

    /// Listing page for coupon bonds (BTP).
    #[arg(long, env = "BTP_SOURCE_URL", default_value = DEFAULT_BTP_URL)]
    pub btp_url: String,

    /// Listing page for discount bills (BOT).
    #[arg(long, env = "BOT_SOURCE_URL", default_value = DEFAULT_BOT_URL)]
    pub bot_url: String,

    /// Wall-clock budget for the whole run, in seconds.
    #[arg(long, env = "BTP_RUN_BUDGET_SECS", default_value_t = 90)]
    pub run_budget_secs: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, env = "BTP_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retries per page after the first attempt.
    #[arg(long, env = "BTP_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Base backoff between retries, in milliseconds (doubles each retry).
    #[arg(long, env = "BTP_RETRY_BASE_MS", default_value_t = 500)]
    pub retry_base_ms: u64,

    /// Maximum redirects followed per request.
    #[arg(long, env = "BTP_MAX_REDIRECTS", default_value_t = 5)]
    pub max_redirects: usize,

    /// User-Agent sent to the upstream sites.
    #[arg(long, env = "BTP_USER_AGENT", default_value = concat!("btp-tracker/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Keep at most N quotes per family (in page order).
    #[arg(long, env = "BTP_MAX_PER_FAMILY")]
    pub max_per_family: Option<usize>,

    /// Fail the run when a family yields no records instead of warning.
    #[arg(long)]
    pub fail_on_empty: bool,
}

/// Options for `btp show`.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Snapshot JSON produced by `btp scrape`.
    #[arg(short, long, env = "BTP_OUTPUT", default_value = DEFAULT_SNAPSHOT_PATH)]
    pub snapshot: PathBuf,

    /// Print only the summary block.
    #[arg(long)]
    pub summary_only: bool,
}

/// Options for `btp scan`.
#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Which family's grammar to apply.
    #[arg(long, value_enum)]
    pub family: InstrumentKind,

    /// Saved HTML page.
    #[arg(long, value_name = "HTML")]
    pub html: PathBuf,
}
