//! Command-line interface definitions.
//!
//! Every option can be given as a flag; the secret and the model chain can
//! also come from the environment.

use clap::{Parser, ValueEnum};

/// How the digest is printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

/// Command-line arguments for one scrape-and-summarize cycle.
///
/// # Examples
///
/// ```sh
/// # Ten headlines, summarized with the default model chain
/// market_news_digest
///
/// # Custom chain, JSON output, market-wide overview
/// market_news_digest --models llama-3.1-8b-instant,gemma-7b-it --format json --overview
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing page to scrape
    #[arg(long, env = "NEWS_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Maximum number of articles to take from the listing
    #[arg(short = 'n', long, default_value_t = 10)]
    pub max_items: usize,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(long, env = "NEWS_API_BASE")]
    pub api_base: Option<String>,

    /// Comma separated model fallback chain, preferred model first
    #[arg(long, env = "NEWS_MODEL_CHAIN")]
    pub models: Option<String>,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Number of articles summarized at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Also produce a market-wide overview with key points
    #[arg(long)]
    pub overview: bool,

    /// Fetch the article page for entries without a snippet
    #[arg(long)]
    pub enrich: bool,

    /// Keep only headlines that mention market keywords
    #[arg(long)]
    pub market_only: bool,
}
