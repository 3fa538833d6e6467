//! Article summarization and tagging through the LLM.
//!
//! The model is asked for a reply shaped like
//!
//! ```text
//! Summary: <at most 128 words>
//! Categories: [Label one, Label two]
//! ```
//!
//! and the reply is parsed leniently. Whatever cannot be recovered from it
//! falls back to defaults (first 128 body characters as the summary, no
//! categories) and the result is flagged with `fell_back` so callers can
//! count it.

use crate::api::AskAsync;
use crate::utils::{cap_words, truncate_chars, truncate_for_log};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{instrument, warn};

/// Words kept from a model-written summary.
pub const SUMMARY_MAX_WORDS: usize = 128;

/// Body characters used as the summary when the model gives none.
pub const FALLBACK_SUMMARY_CHARS: usize = 128;

static SUMMARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Summary:\s*(.*?)\n\s*Categories:").unwrap());
static CATEGORIES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Categories:[ \t]*(.*)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub summary: String,
    pub categories: Vec<String>,
    /// Set when any part of the result is a default rather than model output.
    pub fell_back: bool,
}

impl Classification {
    fn fallback(body: &str) -> Self {
        Classification {
            summary: truncate_chars(body, FALLBACK_SUMMARY_CHARS).to_string(),
            categories: Vec::new(),
            fell_back: true,
        }
    }
}

/// Sends `(title, body)` pairs to the model and parses its answers.
#[derive(Debug)]
pub struct Classifier<A> {
    ask: A,
    labels: Vec<String>,
    body_char_limit: usize,
}

impl<A> Classifier<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(ask: A, labels: Vec<String>, body_char_limit: usize) -> Self {
        Classifier {
            ask,
            labels,
            body_char_limit,
        }
    }

    /// Build the classification prompt. The body is cut to the configured
    /// character limit.
    pub fn prompt(&self, title: &str, body: &str) -> String {
        format!(
            "Title: {title}\n\n\
             Content: {content}\n\n\
             Please provide:\n\
             1. A concise summary (max {SUMMARY_MAX_WORDS} words).\n\
             2. Relevant categories from the following list: {labels}.\n\
             Format as:\nSummary: [summary]\nCategories: [category1, category2, ...]",
            content = truncate_chars(body, self.body_char_limit),
            labels = self.labels.join(", "),
        )
    }

    /// Summarize and tag one article. Never fails; see the module docs for
    /// the fallback rules.
    #[instrument(level = "debug", skip_all, fields(%title))]
    pub async fn classify(&self, title: &str, body: &str) -> Classification {
        match self.ask.ask(&self.prompt(title, body)).await {
            Ok(reply) => {
                let parsed = parse_reply(&reply, body);
                if parsed.fell_back {
                    warn!(
                        reply = %truncate_for_log(&reply, 300),
                        "Classification reply did not match the expected format; using defaults"
                    );
                }
                parsed
            }
            Err(e) => {
                warn!(error = %e, "Classification request failed; using defaults");
                Classification::fallback(body)
            }
        }
    }
}

/// Parse a `Summary: ... / Categories: ...` reply.
pub fn parse_reply(reply: &str, body: &str) -> Classification {
    let summary = SUMMARY_RE
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty());
    let categories = CATEGORIES_RE.captures(reply).map(|c| split_categories(&c[1]));

    let fell_back = summary.is_none() || categories.is_none();
    Classification {
        summary: summary
            .map(|s| cap_words(&s, SUMMARY_MAX_WORDS))
            .unwrap_or_else(|| truncate_chars(body, FALLBACK_SUMMARY_CHARS).to_string()),
        categories: categories.unwrap_or_default(),
        fell_back,
    }
}

fn split_categories(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches(['[', ']'])
        .split(", ")
        .map(|label| label.trim().trim_matches(['"', '\'']).trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .unique()
        .collect()
}
