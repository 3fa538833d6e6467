//! # PR News Digest
//!
//! Crawls a paginated press-release listing, follows every release to its
//! detail page, has an LLM summarize and tag it, and writes one sorted,
//! fully quoted CSV per run. A second subcommand turns that CSV into a
//! "top articles" digest message.
//!
//! ## Usage
//!
//! ```sh
//! pr_news_digest crawl -o news.csv
//! pr_news_digest digest -i news.csv -r ops@example.com
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing walk**: follow each seed's pagination chain, deduplicating
//!    cards by title and link
//! 2. **Detail fetch**: download release bodies, a bounded number at a time
//! 3. **Classification**: summary and category tags per article
//! 4. **Export**: sort newest first, re-render dates, write the CSV atomically
//!
//! Ctrl-C during a crawl discards everything gathered so far.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod api;
mod classify;
mod cli;
mod config;
mod crawl;
mod dates;
mod digest;
mod error;
mod fetch;
mod ledger;
mod models;
mod outputs;
mod scrapers;
mod utils;

use api::chat_with_backoff;
use classify::Classifier;
use cli::{Cli, Command};
use config::Config;
use digest::{Notifier, OutboxNotifier};
use error::CrawlError;
use fetch::HttpFetcher;
use models::Candidate;
use outputs::csv::{CsvExporter, load_artifact, remove_previous};
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("pr_news_digest starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, command = ?args.command, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => Config::default(),
    };
    if let Some(key) = args.api_key {
        config.llm.api_key = Some(key);
    }

    match args.command {
        Command::Crawl { output, fields } => run_crawl(&config, &output, fields).await?,
        Command::Digest {
            input,
            recipient,
            top,
            outbox,
        } => run_digest(&config, &input, &recipient, top, outbox).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// One crawl session: walk, fetch, classify, export.
async fn run_crawl(
    config: &Config,
    output: &Path,
    fields: Option<Vec<String>>,
) -> Result<(), Box<dyn Error>> {
    let seeds = config
        .seeds
        .iter()
        .map(|s| Url::parse(s).map_err(|e| CrawlError::Config(format!("seed {s:?}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;

    let http = HttpFetcher::client_for(config)?;
    let fetcher = HttpFetcher::new(http.clone(), config.fetch_retries);
    let classifier = Classifier::new(
        chat_with_backoff(
            http,
            &config.llm,
            &config.llm.model,
            config.llm.classify_max_tokens,
        )?,
        config.llm.categories.clone(),
        config.llm.body_char_limit,
    );

    // Early check: fail before any network traffic if the artifact can't land
    if let Err(e) = ensure_writable_parent(output).await {
        error!(
            path = %output.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    remove_previous(output).await?;

    let exporter = match fields {
        Some(fields) => CsvExporter::with_fields(fields),
        None => CsvExporter::new(),
    };
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C; crawl is not interruptible");
            std::future::pending::<()>().await;
        }
    };

    info!(
        seeds = seeds.len(),
        concurrency = config.concurrency,
        model = %config.llm.model,
        "Starting crawl"
    );
    let count = crawl::crawl_to_artifact(
        &fetcher,
        &classifier,
        seeds,
        config,
        exporter,
        output,
        interrupted,
    )
    .await?;
    info!(path = %output.display(), records = count, "Crawl session complete");
    Ok(())
}

/// Build and deliver the top-`k` digest for a previous crawl.
async fn run_digest(
    config: &Config,
    input: &Path,
    recipient: &str,
    k: usize,
    outbox: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let records = match load_artifact(input).await? {
        Some(records) if !records.is_empty() => records,
        _ => {
            warn!(path = %input.display(), "No data to summarize; run the crawl first");
            return Ok(());
        }
    };

    let candidates: Vec<Candidate> = records.iter().map(Candidate::from).collect();
    let http = HttpFetcher::client_for(config)?;
    let selector = chat_with_backoff(
        http.clone(),
        &config.llm,
        &config.llm.model,
        config.llm.select_max_tokens,
    )?;
    let narrator = chat_with_backoff(
        http,
        &config.llm,
        &config.llm.narrative_model,
        config.llm.narrative_max_tokens,
    )?;

    let selection = digest::select_top(&selector, k, &candidates).await;
    let selected = digest::resolve(&records, &selection);
    let (summaries, fallbacks) =
        digest::summarize_selected(&narrator, &selected, config.llm.body_char_limit).await;
    info!(
        selected = summaries.len(),
        selection_fell_back = selection.fell_back,
        narrative_fallbacks = fallbacks,
        "Digest assembled"
    );

    let message = digest::render_message(recipient, &summaries, Local::now().date_naive());
    OutboxNotifier::new(outbox).send(&message).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crawl_without_api_key_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("news.csv");
        std::fs::write(&output, "previous run").unwrap();

        let mut config = Config::default();
        config.llm.api_key = None;

        assert!(run_crawl(&config, &output, None).await.is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous run");
    }
}
