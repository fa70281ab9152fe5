//! # Market News Digest
//!
//! Scrapes the current market headlines from a financial news listing and
//! produces a short AI summary and a sentiment label for each one.
//!
//! ## Pipeline
//!
//! 1. **Scrape**: [`ListingScraper::fetch_articles`] issues one bounded GET
//!    and parses the listing into ordered, de-duplicated [`RawArticle`]s.
//! 2. **Summarize**: [`Summarizer::summarize`] sends a structured prompt to
//!    each model of a [`ModelChain`] in turn until one produces a usable
//!    reply. Transient failures (timeouts, rate limits, server errors) move on
//!    to the next model; permanent failures (bad credential) stop at once.
//! 3. **Display**: results go to the caller as [`DigestEntry`] values, or are
//!    rendered by [`outputs`] as JSON or Markdown.
//!
//! Each cycle is independent: nothing is cached or persisted.
//!
//! ## Example
//!
//! ```no_run
//! use market_news_digest::{ApiKey, Config, GroqClient, ListingScraper, Summarizer, SummarizerSettings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::with_api_key(ApiKey::new("gsk_...")?)?;
//! let scraper = ListingScraper::new(&config)?;
//! let articles = scraper.fetch_articles(config.source_url.as_str(), 5).await?;
//!
//! let summarizer = Summarizer::new(GroqClient::new(&config)?, SummarizerSettings::from(&config));
//! for article in &articles {
//!     match summarizer.summarize(article, &config.model_chain).await {
//!         Ok(summary) => println!("{}: {} [{}]", article.title, summary.text, summary.model_used),
//!         Err(e) => println!("{} (summary unavailable: {e})", article.title),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod scrapers;
pub mod summarizer;
#[cfg(test)]
mod testing;
pub mod utils;

pub use api::{ChatCompletion, ChatMessage, CompletionParams, GroqClient};
pub use config::{ApiKey, Config};
pub use error::{
    Attempt, ConfigError, FailureKind, ModelError, PermanentKind, ScrapeError, SummaryUnavailable,
    TransientKind,
};
pub use models::{
    Confidence, DigestEntry, MarketOverview, ModelChain, RawArticle, Sentiment, Summary,
};
pub use scrapers::{ListingScraper, fetch_articles};
pub use scrapers::economictimes::{ScrapeOptions, parse_listing};
pub use summarizer::{Summarizer, SummarizerSettings};
