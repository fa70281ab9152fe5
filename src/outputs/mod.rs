//! Rendering of one scrape-and-summarize cycle for display.
//!
//! The digest is printed to stdout, never written to disk:
//!
//! - [`json`]: machine-readable view for a UI shell or dashboard
//! - [`markdown`]: human-readable edition
//!
//! Both render every scraped article. Articles whose summary was unavailable
//! are shown with their raw snippet instead of being dropped.

pub mod json;
pub mod markdown;

use crate::error::SummaryUnavailable;
use crate::models::{DigestEntry, MarketOverview, ModelChain};
use crate::utils::edition_for;
use chrono::{DateTime, Local};

/// Everything produced by one cycle.
#[derive(Debug)]
pub struct Digest<'a> {
    pub generated_at: DateTime<Local>,
    pub source_url: &'a str,
    pub model_chain: &'a ModelChain,
    /// `None` when no overview was requested.
    pub overview: Option<Result<MarketOverview, SummaryUnavailable>>,
    pub entries: Vec<DigestEntry<'a>>,
}

impl Digest<'_> {
    /// "morning", "afternoon" or "evening", from the generation time.
    pub fn edition(&self) -> &'static str {
        edition_for(self.generated_at.time())
    }

    /// Entries that got a summary.
    pub fn summarized_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }
}
