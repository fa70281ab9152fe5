use market_news_digest::{
    ChatCompletion, ChatMessage, CompletionParams, ModelChain, ModelError, ScrapeOptions,
    Sentiment, Summarizer, SummarizerSettings, parse_listing,
};
use std::cell::RefCell;
use std::time::Duration;
use url::Url;

const LISTING: &str = r#"<!doctype html>
<html>
  <body>
    <div class="top-news">
      <div class="story-box">
        <h3><a href="/markets/stocks/news/sensex-rallies/articleshow/1.cms">Sensex rallies 700 points as banks surge</a></h3>
        <p class="summary">Private lenders led a broad-based rally.</p>
        <time datetime="2026-10-18T09:45:00+05:30">Oct 18, 2026, 09:45 AM IST</time>
      </div>
      <div class="story-box">
        <h3><a href="/markets/forex/rupee-slips/articleshow/2.cms">Rupee slips to 84.2 against the dollar</a></h3>
      </div>
      <div class="story-box">
        <h3><a href="/markets/ipos/fpos/ipo-subscribed/articleshow/3.cms">IPO subscribed 40 times on final day</a></h3>
        <div class="desc">Retail portion booked 25 times.</div>
      </div>
      <div class="story-box">
        <h3><a href="/markets/commodities/gold/articleshow/4.cms">Gold steadies near record</a></h3>
      </div>
      <div class="story-box">
        <h3><a href="/markets/stocks/earnings/articleshow/5.cms">IT earnings preview</a></h3>
      </div>
    </div>
  </body>
</html>"#;

/// Always answers with the same JSON, remembering who was asked.
struct StubModel {
    calls: RefCell<Vec<String>>,
}

impl ChatCompletion for StubModel {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _params: CompletionParams,
    ) -> Result<String, ModelError> {
        self.calls.borrow_mut().push(model.to_string());
        let title_line = messages
            .last()
            .and_then(|m| m.content.lines().find(|l| l.starts_with("Title: ")))
            .unwrap_or_default();
        Ok(format!(
            r#"{{"summary": "Summary of {}", "sentiment": "positive"}}"#,
            title_line.trim_start_matches("Title: ")
        ))
    }
}

fn settings() -> SummarizerSettings {
    let params = CompletionParams {
        max_tokens: 200,
        temperature: 0.7,
    };
    SummarizerSettings {
        call_timeout: Duration::from_secs(5),
        article_params: params,
        overview_params: params,
    }
}

#[tokio::test]
async fn test_listing_to_summaries() {
    let base = Url::parse("https://economictimes.indiatimes.com/markets").unwrap();
    let articles = parse_listing(LISTING, &base, 3, ScrapeOptions::default()).unwrap();

    let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Sensex rallies 700 points as banks surge",
            "Rupee slips to 84.2 against the dollar",
            "IPO subscribed 40 times on final day",
        ]
    );
    assert!(articles[0].published_at.is_some());
    assert_eq!(articles[1].snippet, None);
    assert_eq!(articles[2].snippet.as_deref(), Some("Retail portion booked 25 times."));

    let chain = ModelChain::new(["llama-3.1-8b-instant", "llama3-70b-8192"]).unwrap();
    let summarizer = Summarizer::new(
        StubModel {
            calls: RefCell::new(Vec::new()),
        },
        settings(),
    );

    let mut summaries = Vec::new();
    for article in &articles {
        summaries.push(summarizer.summarize(article, &chain).await.unwrap());
    }

    assert_eq!(summaries.len(), 3);
    for (summary, article) in summaries.iter().zip(&articles) {
        assert_eq!(summary.model_used, chain.primary());
        assert_eq!(summary.source_article, article);
        assert_eq!(summary.sentiment, Sentiment::Positive);
        assert_eq!(summary.text, format!("Summary of {}", article.title));
    }
}

#[tokio::test]
async fn test_batch_matches_sequential_order() {
    let base = Url::parse("https://economictimes.indiatimes.com/markets").unwrap();
    let articles = parse_listing(LISTING, &base, 10, ScrapeOptions::default()).unwrap();
    assert_eq!(articles.len(), 5);

    let chain = ModelChain::new(["only-model"]).unwrap();
    let summarizer = Summarizer::new(
        StubModel {
            calls: RefCell::new(Vec::new()),
        },
        settings(),
    );

    let entries = summarizer.summarize_batch(&articles, &chain, 3).await;
    assert_eq!(entries.len(), 5);
    for (entry, article) in entries.iter().zip(&articles) {
        assert_eq!(entry.article, article);
        let summary = entry.outcome.as_ref().unwrap();
        assert_eq!(summary.text, format!("Summary of {}", article.title));
    }
}
