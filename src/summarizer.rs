//! Article summarization over a model fallback chain.
//!
//! Each request walks the [`ModelChain`] in order, one attempt per model:
//!
//! ```text
//! Trying(0) ──ok──────────────▶ Succeeded
//!     │ transient / unparseable
//!     ▼
//! Trying(1) ──permanent───────▶ AbortedPermanent
//!     │ transient
//!     ▼
//!    ...   ──past last model──▶ Exhausted
//! ```
//!
//! Transient failures (timeouts, rate limits, server errors, retired models,
//! replies that do not parse) advance to the next model. Permanent failures
//! (bad credential, rejected request shape) end the chain at once, because
//! every other model would fail the same way.
//!
//! Replies are read with one heuristic whether the model answered with a JSON
//! object, with `Summary: ... / Sentiment: ...` lines, or with plain prose.
//! Prose without a sentiment label gets [`Sentiment::Unknown`]; refusals and
//! truncated JSON are not summaries.

use crate::api::{ChatCompletion, ChatMessage, CompletionParams};
use crate::config::Config;
use crate::error::{Attempt, ModelError, SummaryUnavailable, TransientKind};
use crate::models::{Confidence, DigestEntry, MarketOverview, ModelChain, RawArticle, Sentiment, Summary};
use crate::utils::{collapse_whitespace, truncate_chars, truncate_for_log};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

const ARTICLE_SYSTEM_PROMPT: &str =
    "You are a financial news analyst. Provide clear, concise summaries of stock market news.";
const OVERVIEW_SYSTEM_PROMPT: &str =
    "You are an expert financial analyst providing market summaries for Indian stock markets.";

/// Upper bound on summary length requested from the model.
pub const SUMMARY_MAX_SENTENCES: usize = 3;
/// Articles included in a market overview prompt.
pub const OVERVIEW_ARTICLE_LIMIT: usize = 10;
/// Snippet characters per article in a market overview prompt.
pub const OVERVIEW_SNIPPET_CHARS: usize = 300;
/// Key points kept from a market overview.
pub const OVERVIEW_KEY_POINTS: usize = 5;

static LABELED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[\s>#*_\-]*(summary|overview|sentiment|confidence|key[ _]?points|key[ _]?insights)[\s*_]*:[\s*_]*(.*)$",
    )
    .expect("labeled line regex")
});
static REFUSAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(sorry\b|as\s+an\s+ai\b|i(\s+(cannot|can\s*not|can['’]t|am\s+unable|won['’]t)|['’]m\s+unable)\b)")
        .expect("refusal regex")
});
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+)$").expect("list item regex"));

/// Timeouts and generation parameters, taken from [`Config`] once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummarizerSettings {
    /// Upper bound on a single model call, enforced around the client.
    pub call_timeout: Duration,
    pub article_params: CompletionParams,
    pub overview_params: CompletionParams,
}

impl From<&Config> for SummarizerSettings {
    fn from(config: &Config) -> Self {
        Self {
            call_timeout: config.completion_timeout,
            article_params: CompletionParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
            overview_params: CompletionParams {
                max_tokens: config.overview_max_tokens,
                temperature: config.temperature,
            },
        }
    }
}

/// Summarizes articles through a [`ChatCompletion`] client.
#[derive(Debug)]
pub struct Summarizer<C> {
    client: C,
    settings: SummarizerSettings,
}

enum ChainState<T> {
    Trying(usize),
    Succeeded { model: String, value: T },
    Exhausted,
    AbortedPermanent { model: String, cause: ModelError },
}

impl<C: ChatCompletion> Summarizer<C> {
    /// Wrap a completion client.
    ///
    /// # Arguments
    ///
    /// * `client` - anything implementing [`ChatCompletion`], usually a [`crate::GroqClient`]
    /// * `settings` - per-call timeout and generation parameters
    pub fn new(client: C, settings: SummarizerSettings) -> Self {
        Self { client, settings }
    }

    /// Summarize one article, falling back along `chain`.
    ///
    /// # Arguments
    ///
    /// * `article` - the listing entry; the returned summary borrows it
    /// * `chain` - models to try in order, one attempt each
    ///
    /// # Returns
    ///
    /// The first usable summary with the model that produced it, or
    /// [`SummaryUnavailable`] once the chain is exhausted or a permanent
    /// failure stops it.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn summarize<'a>(
        &self,
        article: &'a RawArticle,
        chain: &ModelChain,
    ) -> Result<Summary<'a>, SummaryUnavailable> {
        let messages = article_prompt(article);
        let ((text, sentiment), model_used) = self
            .run_chain(chain, &messages, self.settings.article_params, parse_article_reply)
            .await?;

        info!(model = %model_used, sentiment = sentiment.as_str(), "Summarized article");
        Ok(Summary {
            source_article: article,
            text,
            sentiment,
            model_used,
        })
    }

    /// Summarize many articles, up to `concurrency` at a time.
    ///
    /// Results come back in `articles` order, matched to their article by url.
    /// Each distinct url is summarized once; repeated articles share that
    /// outcome, so every input article gets an entry.
    ///
    /// # Arguments
    ///
    /// * `articles` - listing entries, usually straight from the scraper
    /// * `chain` - models to try, in order, for every article
    /// * `concurrency` - articles in flight at once; `0` is treated as `1`
    #[instrument(level = "info", skip_all, fields(count = articles.len(), concurrency = concurrency))]
    pub async fn summarize_batch<'a>(
        &self,
        articles: &'a [RawArticle],
        chain: &ModelChain,
        concurrency: usize,
    ) -> Vec<DigestEntry<'a>> {
        let t0 = Instant::now();
        let mut seen = HashSet::new();
        let distinct: Vec<&'a RawArticle> = articles
            .iter()
            .filter(|article| seen.insert(article.url.as_str()))
            .collect();
        if distinct.len() < articles.len() {
            debug!(repeats = articles.len() - distinct.len(), "Repeated urls share one summary");
        }

        let by_url: HashMap<&'a str, Result<Summary<'a>, SummaryUnavailable>> =
            stream::iter(distinct)
                .map(|article| async move {
                    (article.url.as_str(), self.summarize(article, chain).await)
                })
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;

        let entries: Vec<DigestEntry<'a>> = articles
            .iter()
            .filter_map(|article| {
                let outcome = by_url.get(article.url.as_str())?.clone();
                Some(DigestEntry {
                    article,
                    outcome: outcome.map(|summary| Summary {
                        source_article: article,
                        ..summary
                    }),
                })
            })
            .collect();

        let summarized = entries.iter().filter(|e| e.outcome.is_ok()).count();
        info!(
            total = entries.len(),
            summarized,
            unavailable = entries.len() - summarized,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Completed batch summarization"
        );
        entries
    }

    /// One market-wide summary with key points and an overall sentiment.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn market_overview(
        &self,
        articles: &[RawArticle],
        chain: &ModelChain,
    ) -> Result<MarketOverview, SummaryUnavailable> {
        if articles.is_empty() {
            return Ok(MarketOverview {
                text: "No articles found to summarize.".to_string(),
                key_points: Vec::new(),
                sentiment: Sentiment::Neutral,
                confidence: Confidence::Low,
                model_used: None,
                article_count: 0,
            });
        }

        let messages = overview_prompt(articles);
        let (fields, model_used) = self
            .run_chain(chain, &messages, self.settings.overview_params, parse_overview_reply)
            .await?;

        info!(model = %model_used, "Built market overview");
        Ok(MarketOverview {
            text: fields.text,
            key_points: fields.key_points,
            sentiment: fields.sentiment,
            confidence: fields.confidence,
            model_used: Some(model_used),
            article_count: articles.len(),
        })
    }

    async fn run_chain<T>(
        &self,
        chain: &ModelChain,
        messages: &[ChatMessage],
        params: CompletionParams,
        parse: fn(&str) -> Option<T>,
    ) -> Result<(T, String), SummaryUnavailable> {
        let models = chain.models();
        let mut attempted: Vec<Attempt> = Vec::new();
        let mut state = ChainState::Trying(0);

        loop {
            state = match state {
                ChainState::Trying(i) if i >= models.len() => ChainState::Exhausted,
                ChainState::Trying(i) => {
                    let model = &models[i];
                    let outcome = self.attempt(model, messages, params).await.and_then(|raw| {
                        parse(&raw).ok_or_else(|| {
                            warn!(
                                %model,
                                response_preview = %truncate_for_log(&raw, 300),
                                "Model reply did not match the expected shape"
                            );
                            ModelError::transient(
                                TransientKind::MalformedResponse,
                                "reply has no summary text",
                            )
                        })
                    });

                    match outcome {
                        Ok(value) => ChainState::Succeeded {
                            model: model.clone(),
                            value,
                        },
                        Err(cause) => {
                            attempted.push(Attempt {
                                model: model.clone(),
                                failure: cause.kind(),
                            });
                            if cause.is_permanent() {
                                error!(%model, error = %cause, "Permanent model failure; aborting chain");
                                ChainState::AbortedPermanent {
                                    model: model.clone(),
                                    cause,
                                }
                            } else {
                                warn!(
                                    %model,
                                    position = i + 1,
                                    chain_len = models.len(),
                                    error = %cause,
                                    "Model failed; trying next in chain"
                                );
                                ChainState::Trying(i + 1)
                            }
                        }
                    }
                }
                ChainState::Succeeded { model, value } => return Ok((value, model)),
                ChainState::Exhausted => {
                    error!(attempts = attempted.len(), "Model chain exhausted");
                    return Err(SummaryUnavailable::Exhausted { attempted });
                }
                ChainState::AbortedPermanent { model, cause } => {
                    return Err(SummaryUnavailable::Aborted {
                        model,
                        cause,
                        attempted,
                    });
                }
            };
        }
    }

    async fn attempt(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let call = self.client.complete(model, messages, params);
        let result = match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::transient(
                TransientKind::Timeout,
                format!("no reply within {:?}", self.settings.call_timeout),
            )),
        };
        debug!(
            %model,
            ok = result.is_ok(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Model attempt finished"
        );
        result
    }
}

/// Prompt asking for a bounded summary and a sentiment label for one article.
pub fn article_prompt(article: &RawArticle) -> Vec<ChatMessage> {
    let mut article_text = format!("Title: {}\n", article.title);
    if let Some(snippet) = &article.snippet {
        article_text.push_str(&format!("Content: {snippet}\n"));
    }

    let prompt = format!(
        "Summarize this stock market news article in at most {SUMMARY_MAX_SENTENCES} sentences \
         and classify its sentiment for investors.\n\n\
         {article_text}\n\
         Focus on key market movements or events, their impact on stocks or sectors, \
         and any important numbers or percentages.\n\n\
         Respond with only a JSON object: \
         {{\"summary\": \"<summary>\", \"sentiment\": \"positive\" | \"neutral\" | \"negative\"}}"
    );

    vec![ChatMessage::system(ARTICLE_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Prompt asking for a market-wide view over the leading articles.
pub fn overview_prompt(articles: &[RawArticle]) -> Vec<ChatMessage> {
    let mut articles_text = String::new();
    for (i, article) in articles.iter().take(OVERVIEW_ARTICLE_LIMIT).enumerate() {
        articles_text.push_str(&format!("\nArticle {}:\nTitle: {}\n", i + 1, article.title));
        if let Some(snippet) = &article.snippet {
            articles_text.push_str(&format!(
                "Content: {}...\n",
                truncate_chars(snippet, OVERVIEW_SNIPPET_CHARS)
            ));
        }
        articles_text.push_str("---\n");
    }

    let prompt = format!(
        "Based on today's stock market news articles below, summarize the current market \
         situation in 4-5 sentences, list the top {OVERVIEW_KEY_POINTS} key insights for \
         investors, and judge the overall market sentiment.\n\n\
         News Articles:\n{articles_text}\n\
         Respond with only a JSON object: \
         {{\"summary\": \"<summary>\", \"key_points\": [\"<insight>\", ...], \
         \"sentiment\": \"positive\" | \"neutral\" | \"negative\", \
         \"confidence\": \"high\" | \"medium\" | \"low\"}}"
    );

    vec![ChatMessage::system(OVERVIEW_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Fields pulled out of a model reply, before normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplyFields {
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub confidence: Option<String>,
    pub key_points: Vec<String>,
}

/// Read a reply as a JSON object if it contains one, else as labeled lines.
pub fn extract_reply(raw: &str) -> ReplyFields {
    match json_object(raw) {
        Some(object) => fields_from_json(&object),
        None => fields_from_text(raw),
    }
}

// Models wrap JSON in prose or ``` fences; take the outermost braces.
fn json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn field_name(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn fields_from_json(object: &serde_json::Map<String, Value>) -> ReplyFields {
    let mut fields = ReplyFields::default();
    for (key, value) in object {
        match (field_name(key).as_str(), value) {
            ("summary" | "text" | "overview", Value::String(s)) => {
                fields.summary.get_or_insert_with(|| s.clone());
            }
            ("sentiment", Value::String(s)) => fields.sentiment = Some(s.clone()),
            ("confidence", Value::String(s)) => fields.confidence = Some(s.clone()),
            ("keypoints" | "keyinsights" | "insights", Value::Array(items)) => {
                fields.key_points = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }
    fields
}

fn fields_from_text(raw: &str) -> ReplyFields {
    let mut fields = ReplyFields::default();
    let mut unlabeled = Vec::new();

    for line in raw.lines() {
        if let Some(caps) = LABELED_LINE.captures(line) {
            let value = caps[2].trim().to_string();
            match field_name(&caps[1]).as_str() {
                "summary" | "overview" if !value.is_empty() => fields.summary = Some(value),
                "sentiment" => fields.sentiment = Some(value),
                "confidence" => fields.confidence = Some(value),
                _ => {}
            }
        } else if let Some(caps) = LIST_ITEM.captures(line) {
            fields.key_points.push(caps[1].trim().to_string());
        } else if !line.trim().is_empty() {
            unlabeled.push(line.trim());
        }
    }

    // Unlabeled prose is the summary, with or without a sentiment line.
    if fields.summary.is_none() && !unlabeled.is_empty() {
        let prose = unlabeled.join(" ");
        if !is_non_summary(&prose) {
            fields.summary = Some(prose);
        }
    }
    fields
}

// Refusals, and JSON cut off by the token limit, carry no summary.
fn is_non_summary(prose: &str) -> bool {
    prose.starts_with('{') || REFUSAL.is_match(prose)
}

fn clean_summary(text: Option<String>) -> Option<String> {
    text.map(|t| collapse_whitespace(t.trim_matches(|c: char| c == '"' || c == '\'')))
        .filter(|t| !t.is_empty())
}

fn parse_article_reply(raw: &str) -> Option<(String, Sentiment)> {
    let fields = extract_reply(raw);
    let text = clean_summary(fields.summary)?;
    let sentiment = fields
        .sentiment
        .as_deref()
        .map(Sentiment::from_label)
        .unwrap_or(Sentiment::Unknown);
    Some((text, sentiment))
}

struct OverviewFields {
    text: String,
    key_points: Vec<String>,
    sentiment: Sentiment,
    confidence: Confidence,
}

fn parse_overview_reply(raw: &str) -> Option<OverviewFields> {
    let fields = extract_reply(raw);
    let text = clean_summary(fields.summary)?;
    Some(OverviewFields {
        text,
        key_points: fields
            .key_points
            .into_iter()
            .map(|p| collapse_whitespace(&p))
            .filter(|p| !p.is_empty())
            .take(OVERVIEW_KEY_POINTS)
            .collect(),
        sentiment: fields
            .sentiment
            .as_deref()
            .map(Sentiment::from_label)
            .unwrap_or(Sentiment::Unknown),
        confidence: fields
            .confidence
            .as_deref()
            .map(Confidence::from_label)
            .unwrap_or(Confidence::Unknown),
    })
}
