//! Economic Times markets listing parser.
//!
//! The markets page at <https://economictimes.indiatimes.com/markets> is a
//! long list of story cards. Markup changes regularly, so extraction keys off
//! loose class-name fragments rather than exact classes:
//!
//! | Field | Where it comes from |
//! |-------|---------------------|
//! | card | `div`/`article` whose class contains `story`, `article` or `news`, unless it wraps another complete card |
//! | title | first `h1`..`h4` or `a` in the card |
//! | link | the title anchor, else the first `a[href]` |
//! | snippet | first `p`/`div` whose class contains `summary`, `desc` or `content` |
//! | time | first `time`, or `span` whose class contains `time`/`date` |
//!
//! Parsing is pure (HTML in, articles out) so it can be tested against
//! fixtures without a network.

use crate::error::ScrapeError;
use crate::models::RawArticle;
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Headline keywords for `market_only` filtering.
pub const MARKET_KEYWORDS: &[&str] = &[
    "stock",
    "share",
    "market",
    "sensex",
    "nifty",
    "bse",
    "nse",
    "trading",
    "investment",
    "equity",
    "rupee",
    "earnings",
    "ipo",
    "mutual fund",
    "portfolio",
    "commodity",
    "gold",
    "silver",
];

/// Article bodies are cut to this many characters.
pub const MAX_BODY_CHARS: usize = 2000;

static CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"div[class*="story"], article[class*="story"],
           div[class*="article"], article[class*="article"],
           div[class*="news"], article[class*="news"]"#,
    )
    .expect("card selector")
});
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, a").expect("title selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("link selector"));
static SNIPPET: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"p[class*="summary"], p[class*="desc"], p[class*="content"],
           div[class*="summary"], div[class*="desc"], div[class*="content"]"#,
    )
    .expect("snippet selector")
});
static TIME: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"time, span[class*="time"], span[class*="date"]"#).expect("time selector")
});
static BODY: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "div.article-content",
        "div.story-content",
        "div.news-content",
        "article",
        r#"div[data-module="ArticleContent"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("body selector"))
    .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("p selector"));
static UPDATED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(last\s+)?updated\s*:\s*").expect("prefix regex"));

/// Listing extraction switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Keep only headlines containing one of [`MARKET_KEYWORDS`].
    pub market_only: bool,
}

/// Parse a listing document into at most `max_items` articles, in document order.
///
/// Cards without a title or a usable link are skipped. Repeated urls keep
/// their first occurrence. A document with no cards at all is a
/// [`ScrapeError::Parse`]: the page layout has changed.
///
/// # Arguments
///
/// * `html` - the listing document
/// * `base_url` - the listing's own url, for resolving relative links
/// * `max_items` - upper bound on returned articles; duplicates and filtered
///   headlines do not count toward it
/// * `options` - extraction switches
pub fn parse_listing(
    html: &str,
    base_url: &Url,
    max_items: usize,
    options: ScrapeOptions,
) -> Result<Vec<RawArticle>, ScrapeError> {
    let document = Html::parse_document(html);

    // Wrappers such as a "news-list" div also match. A candidate is a wrapper
    // only if a nested candidate is itself a complete card; snippet blocks like
    // `div.story-content` match the card selector too but carry no headline.
    let cards: Vec<ElementRef> = document
        .select(&CARD)
        .filter(|card| !wraps_complete_card(*card, base_url))
        .collect();

    if cards.is_empty() {
        return Err(ScrapeError::Parse {
            url: base_url.to_string(),
            reason: "no story/article/news containers found".to_string(),
        });
    }
    debug!(cards = cards.len(), "Found candidate story cards");

    let mut seen = HashSet::new();
    let mut articles = Vec::new();
    let mut skipped = 0usize;

    for card in cards {
        if articles.len() >= max_items {
            break;
        }
        let Some(article) = extract_card(card, base_url) else {
            skipped += 1;
            continue;
        };
        if options.market_only && !is_market_headline(&article.title) {
            continue;
        }
        if !seen.insert(article.url.clone()) {
            debug!(url = %article.url, "Duplicate listing entry");
            continue;
        }
        articles.push(article);
    }

    if skipped > 0 {
        warn!(skipped, "Dropped malformed listing entries");
    }
    info!(count = articles.len(), source = %base_url, "Parsed listing");
    Ok(articles)
}

fn wraps_complete_card(card: ElementRef, base_url: &Url) -> bool {
    card.select(&CARD)
        .any(|inner| inner.id() != card.id() && extract_card(inner, base_url).is_some())
}

fn extract_card(card: ElementRef, base_url: &Url) -> Option<RawArticle> {
    let title_el = card.select(&TITLE).next()?;
    let title = collapse_whitespace(&title_el.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let href = match title_el.value().name() {
        "a" => title_el.value().attr("href"),
        _ => None,
    }
    .or_else(|| {
        card.select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
    })?;
    let url = resolve_link(base_url, href)?;

    let mut article = RawArticle::new(title, url);
    if let Some(snippet) = card.select(&SNIPPET).next() {
        article = article.with_snippet(collapse_whitespace(&snippet.text().collect::<String>()));
    }
    if let Some(published_at) = card.select(&TIME).next().and_then(|el| {
        el.value()
            .attr("datetime")
            .and_then(parse_timestamp)
            .or_else(|| parse_timestamp(&el.text().collect::<String>()))
    }) {
        article = article.with_published_at(published_at);
    }
    Some(article)
}

/// Resolve `href` against the listing url, keeping only web links.
pub fn resolve_link(base_url: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut resolved = base_url.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Whether `title` mentions one of [`MARKET_KEYWORDS`], case-insensitively.
pub fn is_market_headline(title: &str) -> bool {
    let title = title.to_lowercase();
    MARKET_KEYWORDS.iter().any(|kw| title.contains(kw))
}

/// Parse the timestamp formats seen on listing pages.
///
/// Accepts RFC 3339 (`datetime` attributes), RFC 2822, and the site's own
/// `Oct 18, 2026, 10:15 AM IST` style, optionally prefixed with `Updated:`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = collapse_whitespace(raw);
    let raw = UPDATED_PREFIX.replace(&raw, "");
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts);
    }

    let local = raw.strip_suffix("IST")?.trim().trim_end_matches(',');
    let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60)?;
    ["%b %d, %Y, %I:%M %p", "%b %d, %Y, %I:%M:%S %p"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(ist).single())
}

/// Pull the readable body text out of an article page.
///
/// Returns `None` when the page has no recognisable content.
pub fn extract_article_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let mut body = BODY
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(visible_text)
        .unwrap_or_default();

    if body.is_empty() {
        body = document
            .select(&PARAGRAPH)
            .map(visible_text)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    if body.is_empty() {
        None
    } else {
        Some(truncate_chars(&body, MAX_BODY_CHARS).to_string())
    }
}

// Text of an element without the contents of nested script/style tags.
fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| matches!(el.value().name(), "script" | "style"));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}
