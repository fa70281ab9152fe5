//! Command-line front end: one scrape-and-summarize cycle, printed to stdout.
//!
//! Logs go to stderr (filter with `RUST_LOG`), so the rendered digest can be
//! piped straight into a display tool.
//!
//! ```sh
//! GROQ_API_KEY=gsk_... market_news_digest -n 5 --overview --format json
//! ```

use chrono::Local;
use clap::Parser;
use market_news_digest::cli::{Cli, OutputFormat};
use market_news_digest::config::SettingsFile;
use market_news_digest::outputs::{Digest, json, markdown};
use market_news_digest::{
    Config, GroqClient, ListingScraper, ScrapeOptions, Summarizer, SummarizerSettings,
};
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_news_digest starting up");

    // ---- Configuration (resolved once, passed down) ----
    let args = Cli::parse();
    debug!(max_items = args.max_items, format = ?args.format, "Parsed CLI arguments");

    let settings = match &args.config {
        Some(path) => SettingsFile::load(path)?,
        None => SettingsFile::default(),
    };
    let config = match Config::resolve(&args, settings) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        source = %config.source_url,
        models = ?config.model_chain,
        "Loaded configuration"
    );

    // ---- Scrape ----
    let scraper = ListingScraper::new(&config)?.with_options(ScrapeOptions {
        market_only: args.market_only,
    });
    let mut articles = match scraper
        .fetch_articles(config.source_url.as_str(), args.max_items)
        .await
    {
        Ok(articles) => articles,
        Err(e) => {
            error!(error = %e, "Listing unavailable; nothing to summarize");
            return Err(e.into());
        }
    };
    if articles.is_empty() {
        warn!("Listing parsed but contained no usable articles");
    }
    if args.enrich {
        articles = scraper.enrich(articles).await;
    }

    // ---- Summarize ----
    let summarizer = Summarizer::new(GroqClient::new(&config)?, SummarizerSettings::from(&config));
    let entries = summarizer
        .summarize_batch(&articles, &config.model_chain, args.concurrency)
        .await;

    let overview = if args.overview {
        let overview = summarizer
            .market_overview(&articles, &config.model_chain)
            .await;
        if let Err(e) = &overview {
            warn!(error = %e, "Market overview unavailable");
        }
        Some(overview)
    } else {
        None
    };

    // ---- Hand off to the display ----
    let digest = Digest {
        generated_at: Local::now(),
        source_url: config.source_url.as_str(),
        model_chain: &config.model_chain,
        overview,
        entries,
    };
    let rendered = match args.format {
        OutputFormat::Json => json::render_digest(&digest)?,
        OutputFormat::Markdown => markdown::render_digest(&digest)?,
    };
    println!("{rendered}");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = digest.entries.len(),
        summarized = digest.summarized_count(),
        edition = digest.edition(),
        "Execution complete"
    );
    Ok(())
}
