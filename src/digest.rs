//! Top-article digest built from a crawl artifact.
//!
//! 1. **Select**: the model picks the `k` most important articles from
//!    their titles, categories and links
//! 2. **Narrate**: each pick gets a two-paragraph write-up (what happened,
//!    then implications)
//! 3. **Render**: one HTML message with a section per article
//! 4. **Deliver**: hand the message to a [`Notifier`]
//!
//! Selection and narration degrade instead of failing: an unusable
//! selection reply becomes "the first `k` articles", and a failed narrative
//! reuses the summary stored in the artifact. Both are logged and flagged.

use crate::api::AskAsync;
use crate::error::CrawlError;
use crate::models::{ArticleRecord, Candidate, TopSummary};
use crate::utils::{escape_html, looks_truncated, slugify_title, truncate_chars, truncate_for_log};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, NaiveDate};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const DEFAULT_TOP_K: usize = 10;

/// Articles chosen by the model, or the first `k` when its reply was unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub titles: Vec<String>,
    pub fell_back: bool,
}

pub fn selection_prompt(candidates: &[Candidate], k: usize) -> String {
    let listing = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a supply chain CEO. From the following articles, select the {k} most important \
         and return only a JSON array of their titles.\n\n{listing}"
    )
}

/// Interpret a selection reply. Titles the model invented are ignored, and
/// the result keeps the model's ranking. `None` when nothing usable remains.
pub fn parse_selection(reply: &str, candidates: &[Candidate], k: usize) -> Option<Vec<String>> {
    let body = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let titles: Vec<String> = match serde_json::from_str(body) {
        Ok(titles) => titles,
        Err(e) => {
            if looks_truncated(&e) {
                warn!("Selection reply was cut off");
            }
            return None;
        }
    };

    let mut picked: Vec<String> = Vec::new();
    for title in titles {
        if picked.len() == k {
            break;
        }
        if candidates.iter().any(|c| c.title == title) && !picked.contains(&title) {
            picked.push(title);
        }
    }
    (!picked.is_empty()).then_some(picked)
}

fn first_k(candidates: &[Candidate], k: usize) -> Vec<String> {
    candidates.iter().take(k).map(|c| c.title.clone()).collect()
}

/// Ask the model for the `k` most important candidates.
#[instrument(level = "info", skip_all, fields(k = k, candidates = candidates.len()))]
pub async fn select_top<A>(ask: &A, k: usize, candidates: &[Candidate]) -> Selection
where
    A: AskAsync<Response = String>,
{
    match ask.ask(&selection_prompt(candidates, k)).await {
        Ok(reply) => match parse_selection(&reply, candidates, k) {
            Some(titles) => Selection {
                titles,
                fell_back: false,
            },
            None => {
                warn!(
                    reply = %truncate_for_log(&reply, 300),
                    "Selection reply unusable; falling back to the first {k} articles"
                );
                Selection {
                    titles: first_k(candidates, k),
                    fell_back: true,
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "Selection request failed; falling back to the first {k} articles");
            Selection {
                titles: first_k(candidates, k),
                fell_back: true,
            }
        }
    }
}

pub fn narrative_prompt(record: &ArticleRecord, body_char_limit: usize) -> String {
    format!(
        "Title: {}\nLink: {}\nContent: {}\n\n\
         Write a natural paragraph summarizing the article. \
         Then a second paragraph on global implications or key figures.",
        record.title,
        record.link,
        truncate_chars(&record.full_text, body_char_limit),
    )
}

/// Write the narrative for each selected record, in selection order.
/// Returns the summaries and how many fell back to the stored summary.
#[instrument(level = "info", skip_all, fields(selected = selected.len()))]
pub async fn summarize_selected<A>(
    ask: &A,
    selected: &[&ArticleRecord],
    body_char_limit: usize,
) -> (Vec<TopSummary>, usize)
where
    A: AskAsync<Response = String>,
{
    let mut summaries = Vec::with_capacity(selected.len());
    let mut fallbacks = 0usize;
    for record in selected {
        let narrative = match ask.ask(&narrative_prompt(record, body_char_limit)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                fallbacks += 1;
                warn!(title = %record.title, "Empty narrative; using stored summary");
                record.summary.clone()
            }
            Err(e) => {
                fallbacks += 1;
                warn!(title = %record.title, error = %e, "Narrative request failed; using stored summary");
                record.summary.clone()
            }
        };
        summaries.push(TopSummary {
            title: record.title.clone(),
            link: record.link.clone(),
            narrative,
        });
    }
    (summaries, fallbacks)
}

/// Records named by `selection`, in selection order.
pub fn resolve<'r>(records: &'r [ArticleRecord], selection: &Selection) -> Vec<&'r ArticleRecord> {
    selection
        .titles
        .iter()
        .filter_map(|title| records.iter().find(|r| &r.title == title))
        .collect()
}

/// A rendered digest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Render one HTML section per summary. The first paragraph of each
/// narrative is the summary, the second is shown as implications.
pub fn render_message(to: &str, summaries: &[TopSummary], date: NaiveDate) -> DigestMessage {
    let sections: String = summaries
        .iter()
        .map(|s| {
            let mut paragraphs = s.narrative.split("\n\n");
            let summary = paragraphs.next().unwrap_or_default();
            let implication = paragraphs.next().unwrap_or_default();
            format!(
                "<h2 style='margin-bottom:5px;'>{}</h2><p>{}</p><p><em>{}</em></p>\
                 <p><a href='{}'>Read the Article &rsaquo;</a></p><hr/>",
                escape_html(&s.title),
                escape_html(summary.trim()),
                escape_html(implication.trim()),
                escape_html(&s.link),
            )
        })
        .collect();

    DigestMessage {
        to: to.to_string(),
        subject: format!(
            "Top {} Supply Chain Updates — {}",
            summaries.len(),
            date.format("%B %d, %Y")
        ),
        html: format!(
            "<html><body>{sections}<p>Best regards,<br/>{}</p></body></html>",
            env!("CARGO_PKG_NAME")
        ),
    }
}

impl DigestMessage {
    /// The message as RFC 5322 text. Fails when the recipient contains
    /// control characters, which could otherwise inject headers.
    pub fn to_eml(&self) -> Result<String, CrawlError> {
        if self.to.trim().is_empty() || self.to.chars().any(char::is_control) {
            return Err(CrawlError::InvalidRecipient(self.to.clone()));
        }
        Ok(format!(
            "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}\r\n",
            self.to,
            encode_header(&self.subject),
            self.html
        ))
    }
}

/// RFC 2047 encoded-word for non-ASCII header values; ASCII passes through.
fn encode_header(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(char::is_control) {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value))
    }
}

/// Delivers a rendered digest.
pub trait Notifier {
    async fn send(&self, message: &DigestMessage) -> Result<(), Box<dyn Error>>;
}

/// Drops each message as an `.eml` file into a directory, for a mail
/// transfer agent or a human to pick up.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutboxNotifier { dir: dir.into() }
    }

    pub fn file_name(message: &DigestMessage, at: DateTime<Local>) -> String {
        format!(
            "{}_{}.eml",
            at.format("%Y-%m-%dT%H-%M-%S"),
            slugify_title(&message.to.replace(['@', '.'], " "))
        )
    }
}

impl Notifier for OutboxNotifier {
    #[instrument(level = "info", skip_all, fields(to = %message.to, dir = %self.dir.display()))]
    async fn send(&self, message: &DigestMessage) -> Result<(), Box<dyn Error>> {
        let eml = message.to_eml()?;
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(message, Local::now()));
        fs::write(&path, eml).await?;
        info!(path = %path.display(), "Digest message written to outbox");
        Ok(())
    }
}
