//! regcrawl main entry point
//!
//! Command-line interface for crawling configured regulatory sources.

use anyhow::{bail, Context};
use clap::Parser;
use regcrawl::config::{load_config_with_hash, Config};
use regcrawl::storage::open_store;
use regcrawl::{CrawlJob, CrawlRequest, Crawler, JobStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// regcrawl: a polite multi-page crawler for regulatory sources
///
/// Crawls each selected source breadth-first from its seed URL, honoring
/// robots.txt and per-origin request spacing, and records jobs and
/// extracted documents in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "regcrawl")]
#[command(version)]
#[command(about = "A polite multi-page crawler for regulatory sources", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl only these configured sources (repeatable)
    #[arg(long = "source", value_name = "ID", conflicts_with = "url")]
    sources: Vec<String>,

    /// Crawl an ad-hoc seed URL instead of configured sources
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Source id recorded for an ad-hoc --url crawl [default: adhoc]
    #[arg(long, value_name = "ID", requires = "url")]
    source_id: Option<String>,

    /// Override the page budget
    #[arg(long)]
    max_pages: Option<u32>,

    /// Override the maximum link depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the number of workers per job
    #[arg(long)]
    concurrency: Option<u32>,

    /// Only fetch the seed page of each source
    #[arg(long)]
    no_follow: bool,

    /// Do not consult robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let requests = build_requests(&cli, &config)?;
    if requests.is_empty() {
        bail!("no active sources to crawl");
    }

    if cli.dry_run {
        print_dry_run(&config, &requests);
        return Ok(());
    }

    handle_crawl(&config, requests).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("regcrawl=info,warn"),
            1 => EnvFilter::new("regcrawl=debug,info"),
            2 => EnvFilter::new("regcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the sources and overrides into crawl requests
fn build_requests(cli: &Cli, config: &Config) -> anyhow::Result<Vec<CrawlRequest>> {
    let mut requests = if let Some(url) = &cli.url {
        let source_id = cli.source_id.as_deref().unwrap_or("adhoc");
        vec![CrawlRequest::with_defaults(source_id, url, &config.crawler)]
    } else if cli.sources.is_empty() {
        config
            .active_sources()
            .map(|source| CrawlRequest::for_source(source, &config.crawler))
            .collect()
    } else {
        cli.sources
            .iter()
            .map(|id| {
                config
                    .source(id)
                    .map(|source| CrawlRequest::for_source(source, &config.crawler))
                    .with_context(|| format!("unknown source '{}'", id))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    for request in &mut requests {
        if let Some(max_pages) = cli.max_pages {
            request.max_pages = max_pages;
        }
        if let Some(max_depth) = cli.max_depth {
            request.max_depth = max_depth;
        }
        if let Some(concurrency) = cli.concurrency {
            request.concurrency = concurrency;
        }
        if cli.no_follow {
            request.follow_links = false;
        }
        if cli.ignore_robots {
            request.respect_robots_txt = false;
        }
        request
            .validate()
            .with_context(|| format!("invalid request for source '{}'", request.source_id))?;
    }

    Ok(requests)
}

fn print_dry_run(config: &Config, requests: &[CrawlRequest]) {
    println!("=== regcrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request delay: {}ms", config.crawler.request_delay);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout);
    println!("  Robots timeout: {}ms", config.crawler.robots_timeout);
    println!("  Dedup scope: {:?}", config.crawler.dedup_scope);
    println!("  Link scope: {:?}", config.crawler.link_scope);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Database: {}", config.output.database_path);

    println!("\nCrawl Requests ({}):", requests.len());
    for request in requests {
        println!("  - {} -> {}", request.source_id, request.start_url);
        println!(
            "    max pages {}, max depth {}, concurrency {}, follow links {}, robots {}",
            request.max_pages,
            request.max_depth,
            request.concurrency,
            request.follow_links,
            request.respect_robots_txt
        );
    }

    println!("\n✓ Configuration is valid");
}

async fn handle_crawl(config: &Config, requests: Vec<CrawlRequest>) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let crawler = Arc::new(Crawler::new(config, Arc::new(store))?);

    let mut ids = Vec::with_capacity(requests.len());
    for request in requests {
        ids.push(crawler.submit(request)?);
    }

    let interrupt = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling {} running jobs", crawler.cancel_all());
            }
        })
    };

    let mut jobs = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(job) = crawler.wait(id).await {
            jobs.push(job);
        }
    }
    interrupt.abort();

    for job in &jobs {
        print_summary(job);
    }

    let failed = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} crawl jobs failed", failed, jobs.len());
    }

    Ok(())
}

fn print_summary(job: &CrawlJob) {
    let counters = &job.counters;
    println!(
        "{} [{}] {}: {} crawled, {} new, {} failed, {} skipped{}",
        job.source_id,
        job.status,
        job.start_url,
        counters.pages_crawled,
        counters.pages_new,
        counters.pages_failed,
        counters.pages_skipped,
        job.error_message
            .as_deref()
            .map(|e| format!(" ({})", e))
            .unwrap_or_default()
    );
}
