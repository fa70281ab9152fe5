//! JSON rendering of a [`Digest`].
//!
//! # Output Structure
//!
//! ```json
//! {
//!   "generated_at": "2026-10-18T14:05:00+05:30",
//!   "edition": "afternoon",
//!   "source_url": "https://economictimes.indiatimes.com/markets",
//!   "model_chain": ["llama-3.1-8b-instant", "..."],
//!   "overview": { "text": "...", "key_points": [], "sentiment": "neutral", ... },
//!   "articles": [
//!     { "title": "...", "url": "...", "snippet": null, "published_at": null,
//!       "summary": { "text": "...", "sentiment": "positive", "model_used": "..." } },
//!     { "title": "...", "url": "...", "snippet": "...", "published_at": null,
//!       "unavailable": { "reason": "...", "attempted": [] } }
//!   ]
//! }
//! ```

use super::Digest;
use crate::error::{Attempt, SummaryUnavailable};
use crate::models::{MarketOverview, ModelChain, RawArticle, Sentiment};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct DigestView<'a> {
    generated_at: DateTime<Local>,
    edition: &'static str,
    source_url: &'a str,
    model_chain: &'a ModelChain,
    #[serde(skip_serializing_if = "Option::is_none")]
    overview: Option<&'a MarketOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overview_unavailable: Option<UnavailableView<'a>>,
    articles: Vec<EntryView<'a>>,
}

#[derive(Debug, Serialize)]
struct EntryView<'a> {
    #[serde(flatten)]
    article: &'a RawArticle,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unavailable: Option<UnavailableView<'a>>,
}

#[derive(Debug, Serialize)]
struct SummaryView<'a> {
    text: &'a str,
    sentiment: Sentiment,
    model_used: &'a str,
}

#[derive(Debug, Serialize)]
struct UnavailableView<'a> {
    reason: String,
    attempted: &'a [Attempt],
}

impl<'a> From<&'a SummaryUnavailable> for UnavailableView<'a> {
    fn from(err: &'a SummaryUnavailable) -> Self {
        Self {
            reason: err.to_string(),
            attempted: err.attempted(),
        }
    }
}

/// Serialize the digest as pretty-printed JSON.
#[instrument(level = "info", skip_all, fields(articles = digest.entries.len()))]
pub fn render_digest(digest: &Digest) -> Result<String, serde_json::Error> {
    let (overview, overview_unavailable) = match &digest.overview {
        Some(Ok(overview)) => (Some(overview), None),
        Some(Err(err)) => (None, Some(UnavailableView::from(err))),
        None => (None, None),
    };

    let articles = digest
        .entries
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(summary) => EntryView {
                article: entry.article,
                summary: Some(SummaryView {
                    text: &summary.text,
                    sentiment: summary.sentiment,
                    model_used: &summary.model_used,
                }),
                unavailable: None,
            },
            Err(err) => EntryView {
                article: entry.article,
                summary: None,
                unavailable: Some(UnavailableView::from(err)),
            },
        })
        .collect();

    let view = DigestView {
        generated_at: digest.generated_at,
        edition: digest.edition(),
        source_url: digest.source_url,
        model_chain: digest.model_chain,
        overview,
        overview_unavailable,
        articles,
    };
    serde_json::to_string_pretty(&view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, TransientKind};
    use crate::models::{DigestEntry, Summary};
    use chrono::TimeZone;

    #[test]
    fn test_render_digest_includes_unavailable_articles() {
        let chain = ModelChain::new(["a", "b"]).unwrap();
        let ok = RawArticle::new("Sensex up", "https://example.com/1");
        let failed = RawArticle::new("Rupee down", "https://example.com/2").with_snippet("Raw teaser");

        let digest = Digest {
            generated_at: Local.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
            source_url: "https://example.com/markets",
            model_chain: &chain,
            overview: None,
            entries: vec![
                DigestEntry {
                    article: &ok,
                    outcome: Ok(Summary {
                        source_article: &ok,
                        text: "Stocks rose.".to_string(),
                        sentiment: Sentiment::Positive,
                        model_used: "a".to_string(),
                    }),
                },
                DigestEntry {
                    article: &failed,
                    outcome: Err(SummaryUnavailable::Exhausted {
                        attempted: vec![Attempt {
                            model: "a".to_string(),
                            failure: FailureKind::Transient(TransientKind::Timeout),
                        }],
                    }),
                },
            ],
        };

        let json: serde_json::Value = serde_json::from_str(&render_digest(&digest).unwrap()).unwrap();
        assert_eq!(json["edition"], "afternoon");
        assert_eq!(json["model_chain"], serde_json::json!(["a", "b"]));
        assert!(json.get("overview").is_none());

        let articles = json["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0]["title"], "Sensex up");
        assert_eq!(articles[0]["summary"]["sentiment"], "positive");
        assert!(articles[0].get("unavailable").is_none());

        assert_eq!(articles[1]["snippet"], "Raw teaser");
        assert!(articles[1].get("summary").is_none());
        assert_eq!(articles[1]["unavailable"]["attempted"][0]["model"], "a");
    }
}
