//! Error taxonomy for a crawl session.
//!
//! Only [`CrawlError::Export`], [`CrawlError::Csv`], [`CrawlError::Config`],
//! [`CrawlError::InvalidRecipient`] and [`CrawlError::Cancelled`] stop a
//! run. Every other variant is logged
//! and absorbed by the component that produced it, so the pipeline degrades
//! to fewer results or emptier fields instead of terminating.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// A listing or detail page could not be retrieved.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// The language model gave no usable answer.
    #[error("classification failed: {0}")]
    Classification(String),

    /// The artifact could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),

    /// A previous artifact exists but holds no readable rows.
    #[error("artifact {} is malformed: {reason}", path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    /// A readable artifact lacks a column the digest needs, as happens with
    /// `crawl --fields`. The file itself is left alone.
    #[error("artifact {} has no {column:?} column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A digest recipient that cannot go into a mail header.
    #[error("invalid recipient address {0:?}")]
    InvalidRecipient(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("crawl cancelled before completion")]
    Cancelled,
}

impl CrawlError {
    /// Transport-level failure (DNS, connect, timeout, truncated body).
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        CrawlError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
            status: None,
        }
    }

    /// The server answered with a non-success status.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        CrawlError::Fetch {
            url: url.into(),
            reason: format!("status {status}"),
            status: Some(status),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CrawlError::Fetch { status: None, .. } => true,
            CrawlError::Fetch {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let e = CrawlError::status("https://example.com/a", 503);
        assert_eq!(e.to_string(), "failed to fetch https://example.com/a: status 503");
    }

    #[test]
    fn test_transient_classification() {
        assert!(CrawlError::fetch("u", "connection reset").is_transient());
        assert!(CrawlError::status("u", 502).is_transient());
        assert!(CrawlError::status("u", 429).is_transient());
        assert!(!CrawlError::status("u", 404).is_transient());
        assert!(!CrawlError::Cancelled.is_transient());
    }
}
