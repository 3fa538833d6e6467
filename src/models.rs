//! Data models for crawled press releases.
//!
//! - [`ArticleStub`]: what a listing card tells us about an article
//! - [`ArticleRecord`]: a stub enriched with body text, summary and categories
//! - [`Candidate`] / [`TopSummary`]: inputs and outputs of the digest stage
//!
//! Records are serialized to CSV by [`crate::outputs::csv`], one column per
//! entry in [`ArticleRecord::FIELDS`].

use serde::Serialize;
use std::borrow::Cow;

/// Separator used when flattening [`ArticleRecord::categories`] into one CSV
/// cell. Some labels contain commas, so a comma cannot be used.
pub const CATEGORY_SEPARATOR: &str = "; ";

/// An article discovered on a listing page, before its detail page is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleStub {
    /// The listing page it was found on (the `page` query parameter).
    pub page: String,
    /// Headline text, whitespace-collapsed.
    pub title: String,
    /// Absolute URL of the detail page.
    pub link: String,
    /// Date text exactly as printed on the card. May be empty.
    pub raw_date: String,
}

/// A fully processed article, ready for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub page: String,
    pub title: String,
    pub link: String,
    /// Raw card date until export re-renders it. Exported as `date`.
    pub raw_date: String,
    /// Labels assigned by the model, in the order it listed them.
    pub categories: Vec<String>,
    pub summary: String,
    pub full_text: String,
}

impl ArticleRecord {
    /// Column names, in export order.
    pub const FIELDS: [&'static str; 7] = [
        "page",
        "title",
        "link",
        "date",
        "categories",
        "summary",
        "full_text",
    ];

    pub fn from_stub(
        stub: ArticleStub,
        categories: Vec<String>,
        summary: String,
        full_text: String,
    ) -> Self {
        ArticleRecord {
            page: stub.page,
            title: stub.title,
            link: stub.link,
            raw_date: stub.raw_date,
            categories,
            summary,
            full_text,
        }
    }

    /// The cell value for a named column, or `None` for unknown columns.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "page" => Cow::Borrowed(self.page.as_str()),
            "title" => Cow::Borrowed(self.title.as_str()),
            "link" => Cow::Borrowed(self.link.as_str()),
            "date" => Cow::Borrowed(self.raw_date.as_str()),
            "categories" => Cow::Owned(self.categories.join(CATEGORY_SEPARATOR)),
            "summary" => Cow::Borrowed(self.summary.as_str()),
            "full_text" => Cow::Borrowed(self.full_text.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

/// One row of the digest selection prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
}

impl From<&ArticleRecord> for Candidate {
    fn from(record: &ArticleRecord) -> Self {
        Candidate {
            title: record.title.clone(),
            categories: record.categories.clone(),
            link: record.link.clone(),
        }
    }
}

/// A selected article with its two-paragraph narrative summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopSummary {
    pub title: String,
    pub link: String,
    /// Summary paragraph, a blank line, then an implications paragraph.
    pub narrative: String,
}
