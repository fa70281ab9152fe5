//! Data models for scraped articles and their summaries.
//!
//! - [`RawArticle`]: one listing entry as scraped, identified by its url
//! - [`Summary`]: model output for one article, borrowing the article it describes
//! - [`ModelChain`]: ordered, non-empty list of models to try
//! - [`MarketOverview`]: one summary across a whole listing
//! - [`DigestEntry`]: an article paired with its summary or the reason it has none

use crate::error::{ConfigError, SummaryUnavailable};
use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use serde::Serialize;

/// Models tried when no chain is configured, preferred first.
pub const DEFAULT_MODEL_CHAIN: &[&str] = &[
    "llama-3.1-8b-instant",
    "llama3-8b-8192",
    "llama3-70b-8192",
    "mixtral-8x7b-32768",
    "gemma-7b-it",
];

/// A news listing entry as scraped from the source page.
///
/// Two articles are the same article when their urls are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawArticle {
    /// Headline text, whitespace collapsed.
    pub title: String,
    /// Absolute link to the full story.
    pub url: String,
    /// Teaser text shown under the headline, if the listing has one.
    pub snippet: Option<String>,
    /// Publication time, when the listing exposes a parseable one.
    pub published_at: Option<DateTime<FixedOffset>>,
}

impl RawArticle {
    /// Create an article with only the fields every listing entry has.
    ///
    /// # Arguments
    ///
    /// * `title` - headline text, already whitespace-collapsed
    /// * `url` - absolute link; it is the article's identity
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: None,
            published_at: None,
        }
    }

    /// Attach teaser text. A blank snippet leaves the article without one.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        self.snippet = if snippet.trim().is_empty() {
            None
        } else {
            Some(snippet)
        };
        self
    }

    /// Attach the publication time parsed from the listing.
    pub fn with_published_at(mut self, published_at: DateTime<FixedOffset>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// Closed set of sentiment labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl Sentiment {
    /// Normalize a model-reported label. Anything outside the enum is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unknown => "unknown",
        }
    }
}

/// How sure the model claims to be about a market-wide sentiment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl Confidence {
    /// Same normalization as [`Sentiment::from_label`]; unrecognised labels are `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            "low" => Confidence::Low,
            _ => Confidence::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        }
    }
}

// Models like to decorate labels: "**Positive**", "Neutral.", "`negative`".
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Model output for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary<'a> {
    /// The article this summary describes.
    pub source_article: &'a RawArticle,
    pub text: String,
    pub sentiment: Sentiment,
    /// Which model in the chain produced this summary.
    pub model_used: String,
}

/// Market-wide summary built from a whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketOverview {
    pub text: String,
    pub key_points: Vec<String>,
    pub sentiment: Sentiment,
    pub confidence: Confidence,
    /// `None` when no model was needed (empty listing).
    pub model_used: Option<String>,
    pub article_count: usize,
}

/// An article with its summary, or the reason it has none.
///
/// Articles without a summary are still meant to be displayed.
#[derive(Debug)]
pub struct DigestEntry<'a> {
    pub article: &'a RawArticle,
    pub outcome: Result<Summary<'a>, SummaryUnavailable>,
}

/// Ordered fallback list of model identifiers. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelChain(Vec<String>);

impl ModelChain {
    /// Build a chain, trimming names and dropping blanks and repeats.
    ///
    /// The first occurrence of a model keeps its position.
    pub fn new<I, S>(models: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.as_ref().trim().to_string())
            .filter(|m| !m.is_empty())
            .unique()
            .collect();

        if models.is_empty() {
            return Err(ConfigError::EmptyModelChain);
        }
        Ok(Self(models))
    }

    /// Parse a comma separated list such as `"a, b,c"`.
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(','))
    }

    /// Model identifiers in the order they are tried.
    pub fn models(&self) -> &[String] {
        &self.0
    }

    /// Iterate model identifiers in fallback order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The preferred model.
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    /// Number of models; never zero.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed chain; present for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ModelChain {
    fn default() -> Self {
        Self(DEFAULT_MODEL_CHAIN.iter().map(|m| m.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_normalization() {
        assert_eq!(Sentiment::from_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label("  Negative. "), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("**NEUTRAL**"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label("bullish"), Sentiment::Unknown);
        assert_eq!(Sentiment::from_label("mostly positive"), Sentiment::Unknown);
        assert_eq!(Sentiment::from_label(""), Sentiment::Unknown);
    }

    #[test]
    fn test_confidence_normalization() {
        assert_eq!(Confidence::from_label("High"), Confidence::High);
        assert_eq!(Confidence::from_label("medium"), Confidence::Medium);
        assert_eq!(Confidence::from_label("very low"), Confidence::Unknown);
    }

    #[test]
    fn test_model_chain_rejects_empty() {
        assert!(matches!(
            ModelChain::new(Vec::<String>::new()),
            Err(ConfigError::EmptyModelChain)
        ));
        assert!(matches!(
            ModelChain::parse_list(" , ,"),
            Err(ConfigError::EmptyModelChain)
        ));
    }

    #[test]
    fn test_model_chain_keeps_order_and_drops_repeats() {
        let chain = ModelChain::parse_list("b, a ,b,c").unwrap();
        assert_eq!(chain.models(), &["b", "a", "c"]);
        assert_eq!(chain.primary(), "b");
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_default_chain() {
        let chain = ModelChain::default();
        assert_eq!(chain.primary(), "llama-3.1-8b-instant");
        assert_eq!(chain.len(), DEFAULT_MODEL_CHAIN.len());
    }

    #[test]
    fn test_blank_snippet_is_none() {
        let article = RawArticle::new("Sensex rallies", "https://example.com/a").with_snippet("  ");
        assert_eq!(article.snippet, None);
    }

    #[test]
    fn test_summary_serialization() {
        let article = RawArticle::new("Nifty ends flat", "https://example.com/nifty")
            .with_snippet("Benchmarks closed unchanged.");
        let summary = Summary {
            source_article: &article,
            text: "Markets were flat.".to_string(),
            sentiment: Sentiment::Neutral,
            model_used: "llama3-8b-8192".to_string(),
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"sentiment\":\"neutral\""));
        assert!(json.contains("\"url\":\"https://example.com/nifty\""));
        assert!(json.contains("\"model_used\":\"llama3-8b-8192\""));
    }
}
