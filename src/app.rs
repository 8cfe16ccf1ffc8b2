//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging
//! - runs the scrape pipeline and persists the snapshot
//! - prints reports

use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use crate::cli::{Command, ScanArgs, ScrapeArgs, ShowArgs};
use crate::data::HttpFetcher;
use crate::domain::{FetchConfig, ScrapeConfig, SourceUrls};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `btp` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `btp` and `btp --output x.json` behave like `btp scrape ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    crate::logging::init(&cli.log_level);

    match cli.command {
        Command::Scrape(args) => handle_scrape(args),
        Command::Show(args) => handle_show(args),
        Command::Scan(args) => handle_scan(args),
    }
}

fn handle_scrape(args: ScrapeArgs) -> Result<(), AppError> {
    let config = scrape_config_from_args(&args);
    let fetcher = HttpFetcher::new(&config.fetch)?;

    let run = pipeline::run_scrape(&fetcher, &config, Utc::now())?;
    crate::io::write_snapshot(&config.output, &run.snapshot)?;
    info!(path = %config.output.display(), "snapshot saved");

    println!("{}", crate::report::format_run_summary(&run, &config.output));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let snapshot = crate::io::read_snapshot(&args.snapshot)?;

    println!("{}", crate::report::format_snapshot_summary(&snapshot));
    if !args.summary_only {
        println!("{}", crate::report::format_quotes(&snapshot));
    }
    Ok(())
}

fn handle_scan(args: ScanArgs) -> Result<(), AppError> {
    let html = crate::io::read_html(&args.html)?;
    let family = pipeline::extract_quotes(args.family, &html, Utc::now(), None);

    println!("{}", crate::report::format_family_stats(&family.stats));
    println!("{}", crate::report::format_quote_table(&family.quotes));
    Ok(())
}

pub fn scrape_config_from_args(args: &ScrapeArgs) -> ScrapeConfig {
    ScrapeConfig {
        sources: SourceUrls {
            coupon_bonds: args.btp_url.clone(),
            discount_bills: args.bot_url.clone(),
        },
        fetch: FetchConfig {
            user_agent: args.user_agent.clone(),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            max_retries: args.max_retries,
            retry_base_delay: Duration::from_millis(args.retry_base_ms),
            max_redirects: args.max_redirects,
        },
        output: args.output.clone(),
        run_budget: Duration::from_secs(args.run_budget_secs),
        max_per_family: args.max_per_family,
        fail_on_empty: args.fail_on_empty,
    }
}

/// Rewrite argv so `btp` defaults to `btp scrape`.
///
/// Rules:
/// - `btp`                        -> `btp scrape`
/// - `btp --output x.json ...`    -> `btp scrape --output x.json ...`
/// - `btp --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("scrape".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "scrape" | "show" | "scan");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "scrape".to_string());
        return argv;
    }

    argv
}
