//! Listing scraper: one HTTP GET, then a tolerant HTML parse.
//!
//! [`ListingScraper`] owns the HTTP client (timeout and User-Agent come from
//! [`Config`]) and delegates parsing to [`economictimes`], which holds the
//! page-specific selectors.
//!
//! # Failure policy
//!
//! - Transport errors, timeouts and non-success statuses are
//!   [`ScrapeError::Fetch`].
//! - A document without story cards is [`ScrapeError::Parse`].
//! - Individual malformed cards are dropped, never fatal.
//!
//! Nothing is retried or cached; a stale listing is simply fetched again on
//! the next cycle.

pub mod economictimes;

use crate::config::Config;
use crate::error::ScrapeError;
use crate::models::RawArticle;
use economictimes::{ScrapeOptions, extract_article_body, parse_listing};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fetch one listing with a scraper built from `config`.
///
/// Convenience for one-off callers; a long-running process should keep a
/// [`ListingScraper`] so the HTTP client is reused.
///
/// # Arguments
///
/// * `config` - supplies the listing timeout and User-Agent
/// * `source_url` - the listing page to fetch
/// * `max_items` - upper bound on returned articles
///
/// # Returns
///
/// Distinct articles in page order, or a [`ScrapeError`] when the page
/// could not be fetched or has no story cards.
pub async fn fetch_articles(
    config: &Config,
    source_url: &str,
    max_items: usize,
) -> Result<Vec<RawArticle>, ScrapeError> {
    ListingScraper::new(config)?
        .fetch_articles(source_url, max_items)
        .await
}

/// Fetches and parses news listing pages.
#[derive(Debug, Clone)]
pub struct ListingScraper {
    client: Client,
    options: ScrapeOptions,
}

impl ListingScraper {
    /// Build a scraper whose client uses the configured listing timeout and
    /// User-Agent.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Client`] if the TLS backend cannot be initialised.
    pub fn new(config: &Config) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(config.listing_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            options: ScrapeOptions::default(),
        })
    }

    /// Replace the extraction switches, e.g. to keep only market headlines.
    pub fn with_options(mut self, options: ScrapeOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch the listing at `source_url` and return at most `max_items`
    /// distinct articles in page order.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_articles(
        &self,
        source_url: &str,
        max_items: usize,
    ) -> Result<Vec<RawArticle>, ScrapeError> {
        let base_url = Url::parse(source_url).map_err(|e| ScrapeError::Fetch {
            url: source_url.to_string(),
            reason: format!("invalid url: {e}"),
        })?;

        let html = self.get_html(&base_url).await?;
        parse_listing(&html, &base_url, max_items, self.options)
    }

    /// Fetch one article page and extract its body text.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_article_body(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::Fetch {
            url: url.to_string(),
            reason: format!("invalid url: {e}"),
        })?;

        let html = self.get_html(&parsed).await?;
        extract_article_body(&html).ok_or_else(|| ScrapeError::Parse {
            url: url.to_string(),
            reason: "no article content found".to_string(),
        })
    }

    /// Give snippet-less articles their page body as snippet.
    ///
    /// Articles are replaced, not mutated. Failed fetches keep the original
    /// article.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn enrich(&self, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        let enriched: Vec<RawArticle> = stream::iter(articles)
            .then(|article| async move {
                if article.snippet.is_some() {
                    return article;
                }
                match self.fetch_article_body(&article.url).await {
                    Ok(body) => {
                        debug!(url = %article.url, bytes = body.len(), "Fetched article body");
                        article.with_snippet(body)
                    }
                    Err(e) => {
                        warn!(url = %article.url, error = %e, "Article body fetch failed; keeping listing entry");
                        article
                    }
                }
            })
            .collect()
            .await;

        info!(count = enriched.len(), "Enriched articles");
        enriched
    }

    async fn get_html(&self, url: &Url) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        let fetch_error = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(describe_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(describe_reqwest_error(&e)))?;

        info!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::testing::{Canned, closed_port, serve_once};
    use std::time::Duration;

    const LISTING: &str = r#"<html><body>
        <div class="story-card"><h3><a href="/markets/a.cms">Sensex jumps 600 points</a></h3></div>
        <div class="story-card"><h3><a href="/markets/b.cms">Nifty hits record</a></h3></div>
    </body></html>"#;

    fn config() -> Config {
        Config::with_api_key(ApiKey::new("k").unwrap()).unwrap()
    }

    fn scraper() -> ListingScraper {
        ListingScraper::new(&config()).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_and_parses_listing() {
        let base = serve_once(Canned::respond("200 OK", LISTING)).await;
        let articles = fetch_articles(&config(), &format!("{base}/markets"), 5)
            .await
            .unwrap();

        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Sensex jumps 600 points", "Nifty hits record"]);
        assert_eq!(articles[0].url, format!("{base}/markets/a.cms"));
    }

    #[tokio::test]
    async fn test_error_status_is_fetch_error() {
        let base = serve_once(Canned::respond("503 Service Unavailable", "down")).await;
        let result = scraper().fetch_articles(&base, 5).await;

        match result {
            Err(ScrapeError::Fetch { reason, .. }) => assert!(reason.contains("503"), "{reason}"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_fetch_error() {
        let base = closed_port().await;
        let result = scraper().fetch_articles(&base, 5).await;
        assert!(matches!(result, Err(ScrapeError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_stalled_server_is_fetch_error() {
        let mut config = config();
        config.listing_timeout = Duration::from_millis(200);
        let base = serve_once(Canned::Stall).await;

        let result = ListingScraper::new(&config).unwrap().fetch_articles(&base, 5).await;
        match result {
            Err(ScrapeError::Fetch { reason, .. }) => assert!(reason.starts_with("timed out"), "{reason}"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_page_without_cards_is_parse_error() {
        let base = serve_once(Canned::respond("200 OK", "<html><body><p>Maintenance</p></body></html>")).await;
        let result = scraper().fetch_articles(&base, 5).await;
        assert!(matches!(result, Err(ScrapeError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_invalid_source_url_is_fetch_error() {
        let result = scraper().fetch_articles("not a url", 5).await;
        assert!(matches!(result, Err(ScrapeError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_enrich_leaves_articles_with_snippets_alone() {
        let articles = vec![
            RawArticle::new("Sensex up", "https://example.invalid/a").with_snippet("Already here"),
        ];
        let enriched = scraper().enrich(articles.clone()).await;
        assert_eq!(enriched, articles);
    }
}
