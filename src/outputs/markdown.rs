//! Markdown rendering of a [`Digest`].

use super::Digest;
use crate::models::{DigestEntry, MarketOverview};
use crate::utils::upcase;
use std::fmt::{self, Write};

/// Render the digest as a Markdown edition.
pub fn render_digest(digest: &Digest) -> Result<String, fmt::Error> {
    let mut md = String::new();

    writeln!(md, "# Market News: {} Edition\n", upcase(digest.edition()))?;
    writeln!(
        md,
        "_Generated {} from <{}> with `{}`_\n",
        digest.generated_at.format("%Y-%m-%d %H:%M"),
        digest.source_url,
        digest.model_chain.models().join(" → ")
    )?;

    match &digest.overview {
        Some(Ok(overview)) => write_overview(&mut md, overview)?,
        Some(Err(err)) => writeln!(md, "## Market Overview\n\n_Overview unavailable: {err}_\n")?,
        None => {}
    }

    writeln!(
        md,
        "## Headlines ({} of {} summarized)\n",
        digest.summarized_count(),
        digest.entries.len()
    )?;
    if digest.entries.is_empty() {
        writeln!(md, "_No articles found._")?;
    }
    for entry in &digest.entries {
        write_entry(&mut md, entry)?;
    }

    Ok(md)
}

fn write_overview(md: &mut String, overview: &MarketOverview) -> fmt::Result {
    writeln!(md, "## Market Overview\n")?;
    writeln!(
        md,
        "**Sentiment:** {} (confidence: {})\n",
        overview.sentiment.as_str(),
        overview.confidence.as_str()
    )?;
    writeln!(md, "{}\n", overview.text)?;
    if !overview.key_points.is_empty() {
        writeln!(md, "### Key Points\n")?;
        for (i, point) in overview.key_points.iter().enumerate() {
            writeln!(md, "{}. {}", i + 1, point)?;
        }
        writeln!(md)?;
    }
    Ok(())
}

fn write_entry(md: &mut String, entry: &DigestEntry) -> fmt::Result {
    let article = entry.article;
    writeln!(md, "### [{}]({})\n", article.title, article.url)?;
    if let Some(published_at) = article.published_at {
        writeln!(md, "<small>{}</small>\n", published_at.format("%b %d, %Y %H:%M %:z"))?;
    }

    match &entry.outcome {
        Ok(summary) => {
            writeln!(
                md,
                "**{}** · {} <small>`{}`</small>\n",
                upcase(summary.sentiment.as_str()),
                summary.text,
                summary.model_used
            )?;
        }
        Err(err) => {
            if let Some(snippet) = &article.snippet {
                writeln!(md, "> {snippet}\n")?;
            }
            writeln!(md, "_Summary unavailable: {err}_\n")?;
        }
    }
    Ok(())
}
